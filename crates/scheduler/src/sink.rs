/// Receives one result per terminal attempt, before the scheduler acts on it.
///
/// Reporting only: sinks have no say in scheduling decisions.
pub trait ResultSink {
    fn record_result(&mut self, job_name: &str, successful: bool);
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn record_result(&mut self, job_name: &str, successful: bool) {
        (**self).record_result(job_name, successful);
    }
}

impl ResultSink for Vec<(String, bool)> {
    fn record_result(&mut self, job_name: &str, successful: bool) {
        self.push((job_name.to_string(), successful));
    }
}
