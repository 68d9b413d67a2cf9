use crate::functions;
use crate::table::Table;
use rand::seq::SliceRandom as _;
use rand::Rng;

#[derive(Debug, Clone, Default)]
pub struct DecisionTreeOptions {
    /// Number of features examined at each split. `None` means all of them.
    pub max_features: Option<usize>,
}

/// A CART regression tree grown until every leaf is pure or unsplittable.
#[derive(Debug)]
pub struct DecisionTreeRegressor {
    tree: Tree,
}

impl DecisionTreeRegressor {
    pub fn fit<R: Rng + ?Sized>(rng: &mut R, table: Table, options: DecisionTreeOptions) -> Self {
        let tree = Tree::fit(rng, table, options);
        Self { tree }
    }

    pub fn predict(&self, xs: &[f64]) -> f64 {
        self.tree.predict(xs)
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        self.tree.root.depth()
    }
}

#[derive(Debug)]
struct Tree {
    root: Node,
}

impl Tree {
    fn fit<R: Rng + ?Sized>(rng: &mut R, mut table: Table, options: DecisionTreeOptions) -> Self {
        let mut builder = NodeBuilder { rng, options };
        let root = builder.build(&mut table);
        Self { root }
    }

    fn predict(&self, xs: &[f64]) -> f64 {
        self.root.predict(xs)
    }
}

#[derive(Debug)]
struct Node {
    label: f64,
    children: Option<Children>,
}

impl Node {
    fn new(label: f64) -> Self {
        Self {
            label,
            children: None,
        }
    }

    fn predict(&self, xs: &[f64]) -> f64 {
        let mut node = self;
        while let Some(children) = &node.children {
            node = if xs[children.split.column] <= children.split.threshold {
                &children.left
            } else {
                &children.right
            };
        }
        node.label
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        self.children.as_ref().map_or(0, |c| {
            1 + std::cmp::max(c.left.depth(), c.right.depth())
        })
    }
}

#[derive(Debug)]
struct Children {
    split: SplitPoint,
    left: Box<Node>,
    right: Box<Node>,
}

#[derive(Debug)]
struct SplitPoint {
    information_gain: f64,
    column: usize,
    threshold: f64,
    // Rows on the left side once sorted by `column`.
    row: usize,
}

struct NodeBuilder<'r, R: ?Sized> {
    rng: &'r mut R,
    options: DecisionTreeOptions,
}

impl<'r, R: Rng + ?Sized> NodeBuilder<'r, R> {
    fn build(&mut self, table: &mut Table) -> Node {
        if table.is_single_target() {
            let label = table.target().next().expect("never fails");
            return Node::new(label);
        }

        let mut node = Node::new(functions::mean(table.target()));
        let rows = table.rows_len();
        let impurity = functions::mse(table.target());

        let max_features = self
            .options
            .max_features
            .unwrap_or_else(|| table.features_len());
        let columns = (0..table.features_len())
            .filter(|&i| !table.feature(i).any(|f| f.is_nan()))
            .collect::<Vec<_>>();

        let mut best: Option<SplitPoint> = None;
        for &column in
            columns.choose_multiple(&mut *self.rng, std::cmp::min(columns.len(), max_features))
        {
            table.sort_rows_by_feature(column);

            // Prefix sums of the target in sorted order, so each candidate
            // split is scored in constant time.
            let mut sum = Vec::with_capacity(rows + 1);
            let mut square_sum = Vec::with_capacity(rows + 1);
            sum.push(0.0);
            square_sum.push(0.0);
            for y in table.target() {
                sum.push(sum[sum.len() - 1] + y);
                square_sum.push(square_sum[square_sum.len() - 1] + y * y);
            }

            for (row, threshold) in table.thresholds(column) {
                let impurity_l = partial_mse(sum[row], square_sum[row], row);
                let impurity_r = partial_mse(
                    sum[rows] - sum[row],
                    square_sum[rows] - square_sum[row],
                    rows - row,
                );
                let n_l = row as f64 / rows as f64;
                let n_r = 1.0 - n_l;

                let information_gain = impurity - (n_l * impurity_l + n_r * impurity_r);
                if best
                    .as_ref()
                    .map_or(true, |t| t.information_gain < information_gain)
                {
                    best = Some(SplitPoint {
                        information_gain,
                        column,
                        threshold,
                        row,
                    });
                }
            }
        }

        if let Some(best) = best {
            node.children = Some(self.build_children(table, best));
        }
        node
    }

    fn build_children(&mut self, table: &mut Table, split: SplitPoint) -> Children {
        table.sort_rows_by_feature(split.column);
        let (left, right) = table.with_split(split.row, |table| Box::new(self.build(table)));
        Children { split, left, right }
    }
}

fn partial_mse(sum: f64, square_sum: f64, n: usize) -> f64 {
    let n = n as f64;
    let mean = sum / n;
    (square_sum / n - mean * mean).max(0.0)
}
