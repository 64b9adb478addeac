use std::fmt;

pub fn display_fn(f: impl Fn(&mut fmt::Formatter<'_>) -> fmt::Result) -> impl fmt::Display {
    DisplayFn(f)
}

struct DisplayFn<F>(F);
impl<F> fmt::Display for DisplayFn<F>
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.0)(formatter)
    }
}

/// Write the elements of a symbol set as `{a, b, c}`, sorted by label.
pub fn display_set<'a, T>(items: impl IntoIterator<Item = &'a T>) -> impl fmt::Display + 'a
where
    T: fmt::Display + Ord + 'a,
{
    let mut items: Vec<&T> = items.into_iter().collect();
    items.sort();
    display_fn(move |f| {
        f.write_str("{")?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", item)?;
        }
        f.write_str("}")
    })
}
