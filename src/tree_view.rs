use dtree::{Branch, DecodedTree, NodeKind, Title};
use eframe::egui::{self, Color32};
use egui_graphs::{
    DefaultEdgeShape, DefaultNodeShape, DisplayNode, DrawContext, EdgeProps, Graph, GraphView,
    LayoutHierarchical, LayoutStateHierarchical, Node,
};
use petgraph::graph::DefaultIx;
use petgraph::stable_graph::{IndexType, StableGraph};
use petgraph::{Directed, EdgeType};

/// Accent colors of the presentation contract: one for true/1, one
/// for false/0, one for don't-care glyphs.
pub const ACTIVE_COLOR: Color32 = Color32::from_rgb(70, 160, 70);
pub const INACTIVE_COLOR: Color32 = Color32::from_rgb(190, 70, 60);
pub const DONT_CARE_COLOR: Color32 = Color32::GRAY;

/// Node payload handed to the rendering layer.
#[derive(Clone)]
pub struct TreeVisNode {
    pub kind: NodeKind,
    pub label: String,
    pub title: Title,
}

/// Edge payload: which branch, and how many colors flow through it.
#[derive(Clone, Debug)]
pub struct BranchEdge {
    pub branch: Branch,
    pub count: u64,
}

pub type TreeGraphDisplay =
    Graph<TreeVisNode, BranchEdge, Directed, DefaultIx, DefaultNodeShape, BranchEdgeShape>;

pub type TreeGraphView<'a> = GraphView<
    'a,
    TreeVisNode,
    BranchEdge,
    Directed,
    DefaultIx,
    DefaultNodeShape,
    BranchEdgeShape,
    LayoutStateHierarchical,
    LayoutHierarchical,
>;

/// A decoded tree ready for the central panel.
pub struct TreeDisplay {
    pub graph: TreeGraphDisplay,
    pub entropy: f64,
}

/// Build the display graph. Node ids are contiguous from 1, so the
/// petgraph index of node `id` is simply `id - 1`.
pub fn build_tree_display(tree: &DecodedTree) -> TreeDisplay {
    let mut g: StableGraph<TreeVisNode, BranchEdge> = StableGraph::new();

    let mut indices = Vec::with_capacity(tree.nodes.len());
    for node in &tree.nodes {
        indices.push(g.add_node(TreeVisNode {
            kind: node.kind,
            label: node.label.clone(),
            title: node.title.clone(),
        }));
    }
    for edge in &tree.edges {
        g.add_edge(
            indices[edge.from as usize - 1],
            indices[edge.to as usize - 1],
            BranchEdge {
                branch: edge.branch,
                count: edge.weight,
            },
        );
    }

    let mut graph = TreeGraphDisplay::from(&g);
    for (idx, node) in g.node_indices().zip(g.node_weights()) {
        if let Some(graph_node) = graph.node_mut(idx) {
            graph_node.set_label(node.label.clone());
        }
    }
    let edge_indices: Vec<_> = graph.edges_iter().map(|(idx, _)| idx).collect();
    for edge_idx in edge_indices {
        if let Some(edge) = graph.edge_mut(edge_idx) {
            let count = edge.payload().count;
            edge.set_label(count.to_string());
        }
    }

    TreeDisplay {
        graph,
        entropy: tree.entropy,
    }
}

// ------------------------------------------------------------------
// Custom edge shape: false branches red, true branches green
// ------------------------------------------------------------------

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct BranchEdgeShape {
    default_impl: DefaultEdgeShape,
    active: bool,
}

impl BranchEdgeShape {
    fn color(&self) -> Color32 {
        if self.active {
            ACTIVE_COLOR
        } else {
            INACTIVE_COLOR
        }
    }
}

impl From<EdgeProps<BranchEdge>> for BranchEdgeShape {
    fn from(props: EdgeProps<BranchEdge>) -> Self {
        let active = props.payload.branch.is_true();
        Self {
            default_impl: DefaultEdgeShape::from(props),
            active,
        }
    }
}

impl<N, Ty, Ix, D> egui_graphs::DisplayEdge<N, BranchEdge, Ty, Ix, D> for BranchEdgeShape
where
    N: Clone,
    Ty: EdgeType,
    Ix: IndexType,
    D: DisplayNode<N, BranchEdge, Ty, Ix>,
{
    fn is_inside(
        &self,
        start: &Node<N, BranchEdge, Ty, Ix, D>,
        end: &Node<N, BranchEdge, Ty, Ix, D>,
        pos: egui::Pos2,
    ) -> bool {
        self.default_impl.is_inside(start, end, pos)
    }

    fn shapes(
        &mut self,
        start: &Node<N, BranchEdge, Ty, Ix, D>,
        end: &Node<N, BranchEdge, Ty, Ix, D>,
        ctx: &DrawContext,
    ) -> Vec<egui::Shape> {
        let color = self.color();
        self.default_impl
            .shapes(start, end, ctx)
            .into_iter()
            .map(|shape| recolor_shape(shape, color))
            .collect()
    }

    fn update(&mut self, state: &EdgeProps<BranchEdge>) {
        self.active = state.payload.branch.is_true();
        egui_graphs::DisplayEdge::<N, BranchEdge, Ty, Ix, D>::update(&mut self.default_impl, state);
    }

    fn extra_bounds(
        &self,
        start: &Node<N, BranchEdge, Ty, Ix, D>,
        end: &Node<N, BranchEdge, Ty, Ix, D>,
    ) -> Option<(egui::Pos2, egui::Pos2)> {
        self.default_impl.extra_bounds(start, end)
    }
}

/// Restroke the default edge geometry in the branch color. Text (the
/// count label) keeps the theme color.
fn recolor_shape(shape: egui::Shape, color: Color32) -> egui::Shape {
    use egui::epaint::ColorMode;
    match shape {
        egui::Shape::LineSegment { points, mut stroke } => {
            stroke.color = color;
            egui::Shape::LineSegment { points, stroke }
        }
        egui::Shape::CubicBezier(mut cubic) => {
            cubic.stroke.color = ColorMode::Solid(color);
            egui::Shape::CubicBezier(cubic)
        }
        egui::Shape::QuadraticBezier(mut quad) => {
            quad.stroke.color = ColorMode::Solid(color);
            egui::Shape::QuadraticBezier(quad)
        }
        egui::Shape::Path(mut path) => {
            path.stroke.color = ColorMode::Solid(color);
            if path.fill != Color32::TRANSPARENT {
                path.fill = color;
            }
            egui::Shape::Path(path)
        }
        egui::Shape::Circle(mut circle) => {
            circle.stroke.color = color;
            if circle.fill != Color32::TRANSPARENT {
                circle.fill = color;
            }
            egui::Shape::Circle(circle)
        }
        egui::Shape::Vec(shapes) => egui::Shape::Vec(
            shapes
                .into_iter()
                .map(|s| recolor_shape(s, color))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtree::Decoder;

    #[test]
    fn display_graph_mirrors_the_decoded_tree() {
        let vars = vec!["x".to_string(), "y".to_string()];
        let tokens = [
            "x", "3", "1", "y", "2", "1", "[", "x=0", "]", "[", "y=1", "]", "[", "x=1", "]",
        ];
        let tree = Decoder::new(&vars).decode(&tokens, 4).unwrap();
        let display = build_tree_display(&tree);

        assert_eq!(display.graph.node_count(), tree.nodes.len());
        assert_eq!(display.graph.edge_count(), tree.edges.len());
        assert_eq!(display.entropy, tree.entropy);
    }

    #[test]
    fn edges_carry_branch_and_count() {
        let vars = vec!["x".to_string()];
        let tokens = ["x", "3", "1", "[", "x=0", "]", "[", "x=1", "]"];
        let tree = Decoder::new(&vars).decode(&tokens, 4).unwrap();
        let display = build_tree_display(&tree);

        let mut counts: Vec<(Branch, u64)> = display
            .graph
            .edges_iter()
            .map(|(_, edge)| {
                let payload = edge.payload();
                (payload.branch, payload.count)
            })
            .collect();
        counts.sort_by_key(|(_, c)| *c);
        assert_eq!(counts, vec![(Branch::True, 1), (Branch::False, 3)]);
    }

    #[test]
    fn node_labels_come_from_the_decoder() {
        let vars = vec!["x".to_string()];
        let tokens = ["x", "2", "2", "[", "x=0", "]", "[", "x=1", "]"];
        let tree = Decoder::new(&vars).decode(&tokens, 4).unwrap();
        let display = build_tree_display(&tree);

        let labels: Vec<String> = display
            .graph
            .nodes_iter()
            .map(|(_, node)| node.label().to_string())
            .collect();
        assert_eq!(labels, vec!["0", "1", "x"]);
    }
}
