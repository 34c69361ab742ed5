use crate::{emit_success, OutputMode};
use flowref::config::FlowrefConfig;
use flowref::ignore::find_snapshots;
use flowref::ui::{self, banner, success, CheckProgress, Icons};
use flowref::watcher::{SnapshotEvent, SnapshotWatcher};
use flowref::{
    find_dependents, is_valid_reference, NodeId, NodeIssues, Resolver, WorkflowGraph,
};
use std::path::Path;
use std::time::Instant;

fn load(path: &Path) -> anyhow::Result<WorkflowGraph> {
    WorkflowGraph::load(path)
        .map_err(|e| anyhow::anyhow!("failed to load {}: {}", path.display(), e))
}

fn require_node(graph: &WorkflowGraph, node: &NodeId) -> anyhow::Result<()> {
    if !graph.index().contains(node) {
        anyhow::bail!("node {} not found in graph", node);
    }
    Ok(())
}

pub fn run_scope(
    output_mode: OutputMode,
    config: &FlowrefConfig,
    path: &Path,
    node: &str,
    picker: bool,
) -> anyhow::Result<()> {
    let graph = load(path)?;
    let target = NodeId::from(node);
    require_node(&graph, &target)?;
    let resolver = config.resolver();
    tracing::info!("Resolving scope of {} in {}", target, path.display());

    if picker {
        let nodes = resolver.available_variables(&target, &graph);
        if output_mode.is_human() {
            nodes.iter().for_each(ui::picker_group);
        } else {
            emit_success(output_mode, "scope", serde_json::to_value(&nodes)?)?;
        }
        return Ok(());
    }

    let scope = resolver.resolve(&target, &graph);
    if output_mode.is_human() {
        ui::heading(&format!("Scope of node {}", target));
        if scope.is_empty() {
            ui::nothing("Previous nodes");
            return Ok(());
        }
        ui::status(Icons::LINK, "Previous nodes", &scope.previous_ids().join(", "));
        if !scope.inner_previous_nodes.is_empty() {
            let inner: Vec<&str> = scope.inner_previous_nodes.iter().map(|n| n.id.as_str()).collect();
            ui::status(Icons::LOOP, "Loop body", &inner.join(", "));
        }
        println!("{}", ui::scope_table(&scope));
    } else {
        emit_success(output_mode, "scope", serde_json::to_value(&scope)?)?;
    }
    Ok(())
}

pub fn run_refs(output_mode: OutputMode, path: &Path, node: &str) -> anyhow::Result<()> {
    let graph = load(path)?;
    let source = NodeId::from(node);
    require_node(&graph, &source)?;
    let dependents = find_dependents(&source, &graph);

    if output_mode.is_human() {
        ui::heading(&format!("References to node {}", source));
        if dependents.is_empty() {
            ui::nothing("Dependents");
        } else {
            println!("{}", ui::dependents_table(&dependents));
        }
    } else {
        emit_success(output_mode, "refs", serde_json::to_value(&dependents)?)?;
    }
    Ok(())
}

/// Returns false when any snapshot fails to load or has dangling references
pub fn run_check(output_mode: OutputMode, config: &FlowrefConfig, path: &Path) -> anyhow::Result<bool> {
    let files = find_snapshots(path, &config.exclude);
    if files.is_empty() {
        anyhow::bail!("no snapshots found under {}", path.display());
    }

    let resolver = config.resolver();
    let started = Instant::now();
    let progress = CheckProgress::new(files.len());
    let mut reports = Vec::with_capacity(files.len());
    let mut nodes = 0;
    let mut dangling = 0;
    let mut clean = true;

    for file in &files {
        progress.start_file(&file.display().to_string());
        let report = match WorkflowGraph::load(file) {
            Ok(graph) => {
                nodes += graph.index().len();
                let issues = flowref::check_graph_with(&resolver, &graph);
                dangling += issues.iter().map(|i| i.dangling.len()).sum::<usize>();
                clean &= issues.is_empty();
                FileReport::Checked(issues)
            }
            Err(e) => {
                tracing::error!("Failed to load {}: {}", file.display(), e);
                clean = false;
                FileReport::Failed(e.to_string())
            }
        };
        progress.finish_file();
        reports.push((file, report));
    }

    progress.clear();
    if output_mode.is_human() {
        for (file, report) in &reports {
            print_report(file, report);
        }
        progress.finish_with_summary(started.elapsed(), files.len(), nodes, dangling);
    } else {
        let data: Vec<serde_json::Value> = reports
            .iter()
            .map(|(file, report)| match report {
                FileReport::Checked(issues) => serde_json::json!({
                    "file": file.display().to_string(),
                    "issues": issues,
                }),
                FileReport::Failed(error) => serde_json::json!({
                    "file": file.display().to_string(),
                    "error": error,
                }),
            })
            .collect();
        emit_success(output_mode, "check", serde_json::json!({ "clean": clean, "files": data }))?;
    }
    Ok(clean)
}

enum FileReport {
    Checked(Vec<NodeIssues>),
    Failed(String),
}

fn print_report(file: &Path, report: &FileReport) {
    match report {
        FileReport::Checked(issues) if issues.is_empty() => {
            ui::snapshot_clean(&file.display().to_string());
        }
        FileReport::Checked(issues) => {
            let dangling = issues.iter().map(|i| i.dangling.len()).sum();
            ui::snapshot_with_issues(&file.display().to_string(), dangling);
            println!("{}", ui::issues_table(issues));
        }
        FileReport::Failed(error) => {
            ui::error(&format!("{}: {}", file.display(), error));
        }
    }
}

pub fn run_validate(
    output_mode: OutputMode,
    config: &FlowrefConfig,
    path: &Path,
    node: &str,
    tokens: &[String],
) -> anyhow::Result<bool> {
    let graph = load(path)?;
    let target = NodeId::from(node);
    require_node(&graph, &target)?;
    let scope = config.resolver().resolve(&target, &graph);

    let results: Vec<serde_json::Value> = tokens
        .iter()
        .map(|token| {
            let arg = scope.arg_map.resolve(token);
            serde_json::json!({
                "token": token,
                "valid": is_valid_reference(token, &scope.arg_map),
                "resolves": arg.is_some(),
                "dataType": arg.and_then(|a| a.data_type.as_ref()).map(|t| t.tag()),
            })
        })
        .collect();
    let all_resolve = results.iter().all(|r| r["resolves"] == true);

    if output_mode.is_human() {
        for result in &results {
            let token = result["token"].as_str().unwrap_or_default();
            if result["resolves"] == true {
                let data_type = result["dataType"].as_str().unwrap_or("unknown");
                success(&format!("{} ({})", token, data_type));
            } else {
                ui::error(&format!("{} is not in scope of node {}", token, target));
            }
        }
    } else {
        emit_success(output_mode, "validate", serde_json::json!({ "node": target, "results": results }))?;
    }
    Ok(all_resolve)
}

pub fn run_stats(output_mode: OutputMode, path: &Path) -> anyhow::Result<()> {
    let graph = load(path)?;
    let stats = graph.index().stats();

    if output_mode.is_human() {
        ui::status(Icons::STATS, "Snapshot", &path.display().to_string());
        println!("{}", ui::stats_table(&stats));
    } else {
        emit_success(output_mode, "stats", serde_json::to_value(&stats)?)?;
    }
    Ok(())
}

fn report_graph(output_mode: OutputMode, resolver: &Resolver, path: &Path, graph: &WorkflowGraph, node: Option<&NodeId>) {
    let result = match node {
        Some(target) => {
            let scope = resolver.resolve(target, graph);
            if output_mode.is_human() {
                ui::status(Icons::MOD, "Updated", &path.display().to_string());
                println!("{}", ui::scope_table(&scope));
                Ok(())
            } else {
                serde_json::to_value(&scope)
                    .map_err(anyhow::Error::from)
                    .and_then(|data| emit_success(output_mode, "watch", data))
            }
        }
        None => {
            let issues = flowref::check_graph_with(resolver, graph);
            if output_mode.is_human() {
                print_report(path, &FileReport::Checked(issues));
                Ok(())
            } else {
                emit_success(
                    output_mode,
                    "watch",
                    serde_json::json!({ "file": path.display().to_string(), "issues": issues }),
                )
            }
        }
    };
    if let Err(e) = result {
        tracing::error!("Failed to report {}: {}", path.display(), e);
    }
}

pub fn run_watch(
    output_mode: OutputMode,
    config: &FlowrefConfig,
    path: &Path,
    node: Option<&str>,
) -> anyhow::Result<()> {
    let resolver = config.resolver();
    let target = node.map(NodeId::from);
    let mut watcher = SnapshotWatcher::new(path.to_path_buf(), &config.exclude);

    if output_mode.is_human() {
        banner(
            "Watch",
            &format!("{} Watching {} for changes", Icons::EYE, path.display()),
        );
    }

    for file in find_snapshots(path, &config.exclude) {
        match watcher.reload(&file) {
            Some(Ok(graph)) => report_graph(output_mode, &resolver, &file, &graph, target.as_ref()),
            Some(Err(e)) => ui::warn(&format!("{}: {}", file.display(), e)),
            None => {}
        }
    }

    watcher.run(|event| match event {
        SnapshotEvent::Updated(file, graph) => {
            report_graph(output_mode, &resolver, file, &graph, target.as_ref())
        }
        SnapshotEvent::Invalid(file, e) => ui::warn(&format!("{}: {}", file.display(), e)),
        SnapshotEvent::Removed(file) => ui::snapshot_removed(&file.display().to_string()),
    })
}

pub fn run_version(output_mode: OutputMode) -> anyhow::Result<()> {
    if output_mode.is_human() {
        banner(
            "Flowref",
            &format!("Version {}", env!("CARGO_PKG_VERSION")),
        );
    } else {
        let data = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        });
        emit_success(output_mode, "version", data)?;
    }
    Ok(())
}
