/// Strategy that folds an ordered sequence of partial results into one value.
///
/// `add` is called once per completed step, in step order, and never fails.
/// `assemble` is called once, after the last step.
pub trait ResultAssembler<T>: Send {
    type Output;

    fn add(&mut self, partial: T);

    fn assemble(self) -> Self::Output;
}

/// Collects every partial result in call order.
///
/// "Missing" partials are modelled by the caller with `Option<_>` items and
/// are kept as entries like any other value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListAssembler<T> {
    items: Vec<T>,
}

impl<T> ListAssembler<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for ListAssembler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> ResultAssembler<T> for ListAssembler<T> {
    type Output = Vec<T>;

    fn add(&mut self, partial: T) {
        self.items.push(partial);
    }

    fn assemble(self) -> Vec<T> {
        self.items
    }
}

/// Keeps only the most recent partial result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastAssembler<T> {
    last: Option<T>,
}

impl<T> LastAssembler<T> {
    pub fn new() -> Self {
        Self { last: None }
    }
}

impl<T> Default for LastAssembler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> ResultAssembler<T> for LastAssembler<T> {
    type Output = Option<T>;

    fn add(&mut self, partial: T) {
        self.last = Some(partial);
    }

    fn assemble(self) -> Option<T> {
        self.last
    }
}

/// Folds partial results into an accumulator, e.g. a running sum
pub struct FoldAssembler<A, F> {
    acc: A,
    fold: F,
}

impl<A, F> FoldAssembler<A, F> {
    pub fn new(init: A, fold: F) -> Self {
        Self { acc: init, fold }
    }
}

impl<T, A, F> ResultAssembler<T> for FoldAssembler<A, F>
where
    A: Send,
    F: FnMut(&mut A, T) + Send,
{
    type Output = A;

    fn add(&mut self, partial: T) {
        (self.fold)(&mut self.acc, partial);
    }

    fn assemble(self) -> A {
        self.acc
    }
}
