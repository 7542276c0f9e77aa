//! Depth-first pre-order walks over a model's scenes.
//!
//! Scenes are walked in table order, roots and children in stored order.
//! Validation at load guarantees every index is in range and every node is
//! reached at most once per scene, so the explicit stack always drains.

use keystone_shared::Mat4;

use crate::model::{ModelNode, ModelView};

/// Visits every node reachable from every scene root.
pub fn traverse_scenes(model: &ModelView<'_>, mut visit: impl FnMut(u32, &ModelNode)) {
    traverse_scenes_with_transform(model, |index, node, _| visit(index, node));
}

/// Visits every node with its accumulated transform,
/// `parent_global * node.local_transform`, roots starting from identity.
pub fn traverse_scenes_with_transform(
    model: &ModelView<'_>,
    mut visit: impl FnMut(u32, &ModelNode, &Mat4),
) {
    let nodes = model.nodes();
    let mut stack: Vec<(u32, Mat4)> = Vec::with_capacity(nodes.len());
    for scene in model.scenes() {
        stack.extend(model.roots(scene).iter().rev().map(|&root| (root, Mat4::IDENTITY)));
        while let Some((index, parent)) = stack.pop() {
            let node = &nodes[index as usize];
            let global = parent * node.local_transform;
            visit(index, node, &global);
            stack.extend(model.children(node).iter().rev().map(|&child| (child, global)));
        }
    }
}

/// Number of visits to nodes that draw a mesh.
#[must_use]
pub fn count_mesh_nodes(model: &ModelView<'_>) -> usize {
    let mesh_count = model.meshes().len();
    let mut count = 0;
    traverse_scenes(model, |_, node| {
        if node.has_mesh(mesh_count) {
            count += 1;
        }
    });
    count
}
