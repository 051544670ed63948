pub trait Runner {
    type Error;
    /// Runs the component to completion, consuming it.
    fn run(self) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send
    where
        Self: Sized;
}
