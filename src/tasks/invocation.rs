/// A unit of work run for its side effects.
///
/// Closures returning `anyhow::Result<()>` implement this directly.
pub trait Runnable: Send {
    fn run(&mut self) -> anyhow::Result<()>;
}

impl<F> Runnable for F
where
    F: FnMut() -> anyhow::Result<()> + Send,
{
    fn run(&mut self) -> anyhow::Result<()> {
        self()
    }
}

/// A unit of work producing exactly one result.
///
/// Closures returning `anyhow::Result<T>` implement this directly.
pub trait Invocation<T>: Send {
    fn call(&mut self) -> anyhow::Result<T>;
}

impl<T, F> Invocation<T> for F
where
    F: FnMut() -> anyhow::Result<T> + Send,
{
    fn call(&mut self) -> anyhow::Result<T> {
        self()
    }
}

/// Fixed, ordered sequence of invocations run one after another on a single
/// worker. Each result is one partial result for the assembler; the first
/// failing link aborts the chain.
pub struct InvocationChain<T> {
    links: Vec<Box<dyn Invocation<T>>>,
}

impl<T> InvocationChain<T> {
    pub fn new() -> Self {
        Self { links: Vec::new() }
    }

    /// Append a link (builder style)
    pub fn then<I>(mut self, link: I) -> Self
    where
        I: Invocation<T> + 'static,
    {
        self.links.push(Box::new(link));
        self
    }

    pub fn push<I>(&mut self, link: I)
    where
        I: Invocation<T> + 'static,
    {
        self.links.push(Box::new(link));
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub(crate) fn into_links(self) -> Vec<Box<dyn Invocation<T>>> {
        self.links
    }
}

impl<T> Default for InvocationChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<Box<dyn Invocation<T>>>> for InvocationChain<T> {
    fn from(links: Vec<Box<dyn Invocation<T>>>) -> Self {
        Self { links }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closures_are_invocations() {
        let mut counter = 0;
        let mut inv = move || -> anyhow::Result<u32> {
            counter += 1;
            Ok(counter)
        };
        assert_eq!(Invocation::call(&mut inv).unwrap(), 1);
        assert_eq!(Invocation::call(&mut inv).unwrap(), 2);
    }

    #[test]
    fn test_chain_builder() {
        let mut chain = InvocationChain::new()
            .then(|| -> anyhow::Result<&'static str> { Ok("a") })
            .then(|| -> anyhow::Result<&'static str> { Err(anyhow::anyhow!("broken")) });
        chain.push(|| -> anyhow::Result<&'static str> { Ok("c") });
        assert_eq!(chain.len(), 3);
        assert!(!chain.is_empty());

        let mut links = chain.into_links();
        assert_eq!(links[0].call().unwrap(), "a");
        assert!(links[1].call().is_err());
    }
}
