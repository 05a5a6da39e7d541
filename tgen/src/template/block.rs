use super::attr::Attrs;
use super::call::Call;
use crate::error::Result;
use crate::iter::{
    drain, CollectionIterator, CombinatorKind, CompositorKind, ForkIterator, MapIterator,
    SingleValueIterator,
};
use crate::label::BlockId;

#[derive(Debug, Clone)]
pub enum Node {
    /// A fixed call list.
    Calls(Vec<Call>),
    /// Yields the sequences of every child one after another.
    Iterate(Vec<Node>),
    Block(Block),
}

/// Combines the sequences of its children with a combinator and flattens
/// every tuple with a compositor.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub id: BlockId,
    pub attrs: Attrs,
    pub combinator: Option<String>,
    pub compositor: Option<String>,
    pub nodes: Vec<Node>,
}

impl Node {
    pub fn iterator(&self) -> Result<Box<dyn ForkIterator<Vec<Call>>>> {
        match self {
            Node::Calls(calls) => Ok(Box::new(SingleValueIterator::new(calls.clone()))),
            Node::Iterate(nodes) => {
                let mut items = Vec::new();
                for node in nodes {
                    items.extend(drain(&mut node.iterator()?));
                }
                Ok(Box::new(CollectionIterator::new(items)))
            }
            Node::Block(block) => block.iterator(),
        }
    }
}

impl Block {
    pub fn new(id: BlockId) -> Self {
        Block {
            id,
            ..Default::default()
        }
    }

    pub fn iterator(&self) -> Result<Box<dyn ForkIterator<Vec<Call>>>> {
        let combinator = CombinatorKind::parse(self.combinator.as_deref().unwrap_or("diagonal"))?;
        let compositor =
            CompositorKind::parse(self.compositor.as_deref().unwrap_or("catenation"))?;
        let iters = self
            .nodes
            .iter()
            .map(Node::iterator)
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::new(MapIterator::new(
            combinator.build(iters),
            move |lists: Vec<Vec<Call>>| compositor.compose(lists),
        )))
    }

    /// Every call list this block yields, in order.
    pub fn sequences(&self) -> Result<Vec<Vec<Call>>> {
        Ok(drain(&mut self.iterator()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Primitive;

    fn calls(names: &[&str]) -> Node {
        Node::Calls(names.iter().map(|n| Call::op(Primitive::op(n))).collect())
    }

    fn names(seq: &[Call]) -> Vec<String> {
        seq.iter()
            .filter_map(|c| c.primitive().map(|p| p.name.clone()))
            .collect()
    }

    #[test]
    fn product_of_iterations() {
        let block = Block {
            combinator: Some("product".into()),
            nodes: vec![
                Node::Iterate(vec![calls(&["a"]), calls(&["b"])]),
                calls(&["x", "y"]),
            ],
            ..Block::new(BlockId::root())
        };
        let seqs: Vec<_> = block.sequences().unwrap().iter().map(|s| names(s)).collect();
        assert_eq!(seqs, vec![vec!["a", "x", "y"], vec!["b", "x", "y"]]);
    }

    #[test]
    fn rotation_of_nested_block() {
        let inner = Block {
            compositor: Some("rotation".into()),
            nodes: vec![calls(&["a", "b"]), calls(&["x", "y"])],
            ..Block::new(BlockId::root().child(1))
        };
        let block = Block {
            nodes: vec![Node::Block(inner), calls(&["z"])],
            ..Block::new(BlockId::root())
        };
        let seqs = block.sequences().unwrap();
        assert_eq!(seqs.len(), 1);
        assert_eq!(names(&seqs[0]), vec!["a", "x", "b", "y", "z"]);
    }

    #[test]
    fn unknown_names_fail() {
        let block = Block {
            compositor: Some("overlapping".into()),
            ..Block::new(BlockId::root())
        };
        assert!(block.iterator().is_err());
    }
}
