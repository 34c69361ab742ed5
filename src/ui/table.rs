use crate::arg_map::token_for;
use crate::graph::GraphStats;
use crate::references::Dependent;
use crate::scope::{NodePreviousArgs, PreviousNode};
use crate::ui::{theme, Theme};
use crate::validate::NodeIssues;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &GraphStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Nodes", &stats.total_nodes.to_string());
    builder.add_row("In loop bodies", &stats.nested_nodes.to_string());
    builder.add_row("Loops", &stats.loops.to_string());
    builder.add_row("Roots", &stats.roots.to_string());
    builder.add_row("Edges", &stats.total_edges.to_string());
    for (kind, count) in &stats.edges_by_kind {
        builder.add_row(&format!("  {}", kind), &count.to_string());
    }
    builder.build()
}

#[derive(Tabled)]
struct ScopeRow {
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Type")]
    node_type: String,
    #[tabled(rename = "Data Type")]
    data_type: String,
    #[tabled(rename = "Via")]
    via: String,
}

/// Marks rows fed through the loop body or only through failure handlers
fn via_cell(theme: &Theme, via_inner: bool, via_exception: bool) -> String {
    match (via_inner, via_exception) {
        (true, _) => theme.paint(theme.loop_body, "loop body"),
        (false, true) => theme.paint(theme.exception, "exception"),
        (false, false) => String::new(),
    }
}

fn scope_rows<'a>(
    theme: &'a Theme,
    nodes: &'a [PreviousNode],
    via_inner: bool,
) -> impl Iterator<Item = ScopeRow> + 'a {
    nodes.iter().flat_map(move |node| {
        node.output_args.iter().map(move |arg| ScopeRow {
            token: theme.paint(theme.token, &token_for(&node.id, &arg.name)),
            node: node.name.clone(),
            node_type: node.node_type.to_string(),
            data_type: theme.paint(
                theme.data_type,
                &arg.data_type.as_ref().map(|t| t.tag()).unwrap_or_default(),
            ),
            via: via_cell(theme, via_inner, node.via_exception),
        })
    })
}

/// One row per referenceable argument, upstream nodes first
pub fn scope_table(scope: &NodePreviousArgs) -> String {
    scope_table_with(theme(), scope)
}

pub fn scope_table_with(theme: &Theme, scope: &NodePreviousArgs) -> String {
    let rows: Vec<ScopeRow> = scope_rows(theme, &scope.previous_nodes, false)
        .chain(scope_rows(theme, &scope.inner_previous_nodes, true))
        .collect();
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct ReferenceRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Token")]
    token: String,
}

pub fn dependents_table(dependents: &[Dependent]) -> String {
    let rows: Vec<ReferenceRow> = dependents
        .iter()
        .flat_map(|d| {
            d.references.iter().map(move |r| ReferenceRow {
                node: format!("{} ({})", d.node_name, d.node_id),
                field: r.field.clone(),
                token: r.token.clone(),
            })
        })
        .collect();
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn issues_table(issues: &[NodeIssues]) -> String {
    let rows: Vec<ReferenceRow> = issues
        .iter()
        .flat_map(|i| {
            i.dangling.iter().map(move |r| ReferenceRow {
                node: format!("{} ({})", i.node_name, i.node_id),
                field: r.field.clone(),
                token: r.token.clone(),
            })
        })
        .collect();
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}
