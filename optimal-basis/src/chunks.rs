use crate::Error;

/// Iterator adaptor returned by [`grouper`], yielding the items of the inner
/// iterator in groups of `size`.
#[derive(Debug, Clone)]
pub struct Grouper<I> {
    inner: I,
    size: usize,
}

/// Split `iterable` in chunks of `size` items. All chunks contain exactly
/// `size` items, except for the last one which contains between 1 and `size`
/// items. An empty input produces no chunks.
///
/// # Errors
///
/// This function returns an error if `size` is zero.
pub fn grouper<I: IntoIterator>(size: usize, iterable: I) -> Result<Grouper<I::IntoIter>, Error> {
    if size == 0 {
        return Err(Error::InvalidParameter(
            "chunk size must be a positive integer, got 0".into()
        ));
    }

    Ok(Grouper {
        inner: iterable.into_iter(),
        size: size,
    })
}

/// Number of chunks [`grouper`] produces for an input of length `len`
pub fn chunk_count(len: usize, size: usize) -> usize {
    debug_assert!(size > 0);
    len / size + usize::from(len % size != 0)
}

impl<I: Iterator> Iterator for Grouper<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.inner.by_ref().take(self.size).collect::<Vec<_>>();
        if chunk.is_empty() {
            return None;
        }
        return Some(chunk);
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lower, upper) = self.inner.size_hint();
        (
            chunk_count(lower, self.size),
            upper.map(|upper| chunk_count(upper, self.size)),
        )
    }
}

impl<I: ExactSizeIterator> ExactSizeIterator for Grouper<I> {}

impl<I: std::iter::FusedIterator> std::iter::FusedIterator for Grouper<I> {}
