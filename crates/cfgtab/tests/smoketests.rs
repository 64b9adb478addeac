use cfgtab::{
    grammar::{Grammar, Symbol},
    ll1::{self, driver::LL1Driver},
    lr0::{self, StateID},
    slr, syntax,
};
use std::{env, path::PathBuf};

fn load(name: &str) -> Grammar {
    Grammar::from_file(
        &PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap())
            .join(format!("tests/{}.cfg", name)),
    )
    .unwrap()
}

fn s(label: &str) -> Symbol {
    Symbol::new(label).unwrap()
}

fn labels<'a>(symbols: impl IntoIterator<Item = &'a Symbol>) -> Vec<&'a str> {
    let mut labels: Vec<_> = symbols.into_iter().map(|s| s.label()).collect();
    labels.sort_unstable();
    labels
}

macro_rules! define_tests {
    ($($name:ident => { ll1: $ll1:expr, slr: $slr:expr }),*$(,)?) => {$(
        #[test]
        fn $name() {
            let grammar = load(stringify!($name));
            let _ = grammar.display_sets().to_string();

            for t in grammar.terminals() {
                assert_eq!(labels(&grammar.first_set_of(t)), [t.label()]);
            }
            for p in grammar.productions() {
                assert!(!grammar.predict_set_of(p).contains(&Symbol::empty_marker()));
            }

            let disjoint = ll1::predict_sets_disjoint(&grammar).values().all(|d| *d);
            assert_eq!(disjoint, $ll1);
            assert_eq!(ll1::generate(&grammar).is_ok(), $ll1);

            let automaton = lr0::lr0(&grammar);
            for state in automaton.states() {
                assert_eq!(lr0::closure(&grammar, &state.items), state.items);
            }
            assert_eq!(slr::generate(&grammar, &automaton).is_ok(), $slr);
        }
    )*};
}

define_tests! {
    derives_first_follow => { ll1: false, slr: false },
    postfix => { ll1: true, slr: true },
    predict_set => { ll1: true, slr: true },
    expr_ll1 => { ll1: true, slr: true },
    expr_lr => { ll1: false, slr: true },
    assign => { ll1: false, slr: false },
}

#[test]
fn derived_sets_are_exact() {
    let g = load("derives_first_follow");

    assert_eq!(labels(g.derives_to_empty_set()), ["A", "B", "C", "D"]);

    let first = |n: &str| labels(&g.first_set_of(&s(n))).join(" ");
    assert_eq!(first("S"), "$ a b d g h");
    assert_eq!(first("A"), "d g h");
    assert_eq!(first("B"), "g");
    assert_eq!(first("C"), "h");
    assert_eq!(first("D"), "a b d g h");

    let follow = |n: &str| labels(&g.follow_set_of(&s(n))).join(" ");
    assert_eq!(follow("S"), "");
    assert_eq!(follow("A"), "$ g h");
    assert_eq!(follow("B"), "$ a g h");
    assert_eq!(follow("C"), "$ b g h");
    assert_eq!(follow("D"), "$");
}

#[test]
fn postfix_automaton() {
    let g = load("postfix");
    let automaton = lr0::lr0(&g);
    assert_eq!(automaton.states().len(), 7);

    let state0 = &automaton.states()[0].items;
    let dump = state0.display(&g).to_string();
    assert_eq!(state0.len(), 3);
    assert!(dump.contains("START -> [ . E $ ]"), "{}", dump);
    assert!(dump.contains("E -> [ . plus E E ]"), "{}", dump);
    assert!(dump.contains("E -> [ . num ]"), "{}", dump);

    let goto_e = lr0::goto(&g, state0, &s("E"));
    assert_eq!(goto_e.display(&g).to_string(), "- START -> [ E . $ ]\n");
    let goto_num = lr0::goto(&g, state0, &s("num"));
    assert_eq!(goto_num.display(&g).to_string(), "- E -> [ num . ]\n");

    assert_eq!(
        automaton.goto(StateID::from_raw(0), &s("num")),
        automaton.find(&goto_num)
    );
}

#[test]
fn ll1_driver_consumes_whole_stream() {
    let g = load("expr_ll1");
    let table = ll1::generate(&g).unwrap();
    let driver = LL1Driver::new(&g, &table);

    for input in [
        "id $",
        "id plus id times id $",
        "lp id plus id rp times id $",
    ] {
        let tokens = syntax::parse_tokens(input).unwrap();
        let tree = driver.parse(tokens.clone()).unwrap();
        let leaves: Vec<_> = tree
            .leaves()
            .into_iter()
            .filter(|s| !s.is_empty_marker())
            .cloned()
            .collect();
        assert_eq!(leaves, tokens, "{}", input);
    }

    let tokens = syntax::parse_tokens("id plus $").unwrap();
    assert!(driver.parse(tokens).is_err());
}
