use std::fmt;

/// Display an `Option<T>` with a fallback literal for the `None` case.
///
/// Status strings and log lines frequently need to render an op-time or
/// a host that may be absent; the default fallback is `"none"`.
pub(crate) struct DisplayOption<'a, T: fmt::Display> {
    value: &'a Option<T>,
    fallback: &'static str,
}

impl<T: fmt::Display> fmt::Display for DisplayOption<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            None => f.write_str(self.fallback),
            Some(x) => x.fmt(f),
        }
    }
}

pub(crate) trait DisplayOptionExt<'a, T: fmt::Display> {
    fn display(&'a self) -> DisplayOption<'a, T>;

    /// Like `display()`, with an explicit literal for the absent case.
    fn display_or(&'a self, fallback: &'static str) -> DisplayOption<'a, T>;
}

impl<T> DisplayOptionExt<'_, T> for Option<T>
where T: fmt::Display
{
    fn display(&self) -> DisplayOption<'_, T> {
        self.display_or("none")
    }

    fn display_or(&self, fallback: &'static str) -> DisplayOption<'_, T> {
        DisplayOption {
            value: self,
            fallback,
        }
    }
}
