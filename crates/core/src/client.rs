pub trait Client {
    type Error;
    /// Establishes the underlying connection, returning the connected client.
    fn connect(self) -> impl std::future::Future<Output = Result<Self, Self::Error>> + Send
    where
        Self: Sized;
}
