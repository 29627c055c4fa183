pub trait ResultExt<T> {
    /// Log the error, if any, then carry on.
    fn log_error(&self, msg: &str) -> &Self;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for Result<T, E> {
    fn log_error(&self, msg: &str) -> &Self {
        if let Err(e) = self {
            log::error!("{msg}: {e:?}");
        }
        self
    }
}
