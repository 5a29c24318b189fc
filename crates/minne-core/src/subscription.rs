use tokio::sync::watch;

/// A live handle onto a registered store query.
///
/// The store seeds the channel with the current result set when the query
/// is registered, then pushes a fresh full snapshot after every write that
/// could affect the query. Dropping the subscription unregisters it.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: watch::Receiver<Vec<T>>,
}

impl<T: Clone> Subscription<T> {
    pub fn new(rx: watch::Receiver<Vec<T>>) -> Self {
        Self { rx }
    }

    /// The most recent snapshot, without waiting.
    pub fn snapshot(&self) -> Vec<T> {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot. Returns `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Vec<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_and_next() {
        let (tx, rx) = watch::channel(vec![1]);
        let mut sub = Subscription::new(rx);
        assert_eq!(sub.snapshot(), vec![1]);

        tx.send(vec![1, 2]).unwrap();
        assert_eq!(sub.next().await, Some(vec![1, 2]));

        drop(tx);
        assert_eq!(sub.next().await, None);
    }
}
