/// TryIterator is a pull based iterator whose every step may fail.
///
/// `Ok(None)` marks the end of the sequence. Implementations are expected to
/// stop producing values after they returned an error.
pub trait TryIterator {
    type Item;
    type Error;

    fn try_next(&mut self) -> Result<Option<Self::Item>, Self::Error>;

    /// try_collect drains the iterator, stopping at the first error.
    fn try_collect(&mut self) -> Result<Vec<Self::Item>, Self::Error> {
        let mut items = Vec::new();
        while let Some(item) = self.try_next()? {
            items.push(item);
        }
        Ok(items)
    }

    /// try_count drains the iterator and returns how many items it produced.
    fn try_count(&mut self) -> Result<usize, Self::Error> {
        let mut n = 0;
        while self.try_next()?.is_some() {
            n += 1;
        }
        Ok(n)
    }
}
