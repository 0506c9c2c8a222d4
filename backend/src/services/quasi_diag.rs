use crate::services::clustering::Dendrogram;

/// Leaf order of the dendrogram, left to right.
///
/// Returns a permutation of `0..leaf_count` in which assets that were merged
/// early (similar assets) sit next to each other.
pub fn leaf_order(tree: &Dendrogram) -> Vec<usize> {
    let mut order = Vec::with_capacity(tree.leaf_count());
    if tree.leaf_count() == 0 {
        return order;
    }

    let mut stack = vec![tree.root()];
    while let Some(node) = stack.pop() {
        match tree.children(node) {
            Some((left, right)) => {
                // right first so left is visited first
                stack.push(right);
                stack.push(left);
            }
            None => order.push(node),
        }
    }
    order
}
