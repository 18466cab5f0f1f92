use std::fmt::Display;

use log::error;

/// Log-and-skip for recoverable failures: the error is logged once and the
/// unit of work is dropped.
pub trait SkipLog {
    type Output;
    fn skip_log(self, what: impl FnOnce() -> String) -> Option<Self::Output>;
}

impl<T, E> SkipLog for Result<T, E>
where
    E: Display,
{
    type Output = T;
    fn skip_log(self, what: impl FnOnce() -> String) -> Option<Self::Output> {
        match self {
            Err(e) => {
                let what = what();
                error!("{what}: {e}");
                None
            }
            Ok(v) => Some(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_passes_through_without_formatting() {
        let value: Result<u8, String> = Ok(3);
        assert_eq!(value.skip_log(|| unreachable!()), Some(3));
    }

    #[test]
    fn err_becomes_none() {
        let value: Result<u8, String> = Err("boom".into());
        assert_eq!(value.skip_log(|| "ninja".into()), None);
    }
}
