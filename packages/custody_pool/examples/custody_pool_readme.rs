//! Example from the README.

use custody_pool::{Error, Lifecycle, Pool, Result};

#[derive(Debug)]
struct Lines;

impl Lifecycle for Lines {
    type Value = Vec<String>;
    type Config = usize;
    type Source = Vec<String>;

    fn new(&self, capacity: &usize, mut recycled: Vec<String>) -> Result<Vec<String>> {
        recycled.reserve(*capacity);
        Ok(recycled)
    }

    fn parse(&self, source: Vec<String>, _: Vec<String>) -> Result<Vec<String>> {
        Ok(source)
    }

    fn reset(&self, value: &mut Vec<String>) {
        value.clear();
    }

    fn copy(&self, dst: &mut Vec<String>, src: &Vec<String>) -> Result<()> {
        dst.clone_from(src);
        Ok(())
    }
}

fn main() -> Result<()> {
    let pool = Pool::new(Lines);

    let item = pool.new_item(8)?;
    item.p(|lines| lines.push("first".to_string()))?;

    let copy = item.copy()?;
    println!("copied {} line(s)", copy.v(Vec::len)?);

    let lines = item.take()?;
    println!("moved out: {lines:?}");

    // The item is retired once its value has been moved out.
    assert_eq!(item.v(Vec::len), Err(Error::UseAfterDestroy));

    copy.destroy()?;
    assert_eq!(copy.destroy(), Err(Error::DoubleDestroy));

    drop(item);
    drop(copy);

    let (outstanding, retained) = pool.count_outstanding_and_retained();
    println!("outstanding: {outstanding}, retained: {retained}");

    Ok(())
}
