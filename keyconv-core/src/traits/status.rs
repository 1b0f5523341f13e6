//! Status output trait

/// Consumer of the device lifecycle, e.g. a status LED
pub trait StatusSink {
    /// Called whenever the device becomes ready or stops being ready
    fn set_initialised(&mut self, initialised: bool);
}

/// Status sink that discards everything
impl StatusSink for () {
    fn set_initialised(&mut self, _initialised: bool) {}
}
