use std::io::Write;

use affiliator_core::{AFFILIATION, Block, NOT_AFFILIATION, category_score};
use affiliator_parsing::{AffiliationGraph, Extraction, NodeKind};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn print_header(w: &mut dyn Write, title: &str, color: ColorMode) -> std::io::Result<()> {
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", title.bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "{}", title)?;
        writeln!(w, "{}", sep)?;
    }
    Ok(())
}

/// Print the authors and affiliations found in one document.
pub fn print_extraction(
    w: &mut dyn Write,
    name: &str,
    extraction: &Extraction,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w, "Extracting affiliations from {}...", name)?;
    let pages = extraction
        .region
        .pages
        .iter()
        .map(|p| (p + 1).to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let summary = format!(
        "(Region on page {}, {} entities, {} parsing)",
        pages,
        extraction.entities.len(),
        extraction.strategy.as_str()
    );
    if color.enabled() {
        writeln!(w, "{}", summary.dimmed())?;
    } else {
        writeln!(w, "{}", summary)?;
    }
    writeln!(w)?;

    let mapping = extraction.mapping();
    print_header(w, "AUTHORS", color)?;
    for (person, affiliations) in &mapping {
        if color.enabled() {
            writeln!(w, "{}", person.bold())?;
        } else {
            writeln!(w, "{}", person)?;
        }
        if affiliations.is_empty() {
            if color.enabled() {
                writeln!(w, "  {}", "(no affiliation)".dimmed())?;
            } else {
                writeln!(w, "  (no affiliation)")?;
            }
        }
        for affiliation in affiliations {
            writeln!(w, "  - {}", affiliation)?;
        }
    }

    writeln!(w)?;
    let affiliated = mapping.iter().filter(|(_, a)| !a.is_empty()).count();
    writeln!(w, "  Authors found: {}", mapping.len())?;
    if color.enabled() {
        writeln!(w, "  {} {}", "With affiliations:".green(), affiliated)?;
    } else {
        writeln!(w, "  With affiliations: {}", affiliated)?;
    }
    writeln!(w)?;
    Ok(())
}

/// Print why a document produced no affiliations.
pub fn print_no_affiliations(
    w: &mut dyn Write,
    name: &str,
    reason: &str,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}: {}", "No affiliations in".yellow(), name, reason)?;
    } else {
        writeln!(w, "No affiliations in {}: {}", name, reason)?;
    }
    Ok(())
}

/// One row per page, one cell per block: filled for affiliation blocks.
pub fn print_heatmap(
    w: &mut dyn Write,
    pages: &[Vec<Block>],
    color: ColorMode,
) -> std::io::Result<()> {
    print_header(w, "BLOCKS", color)?;
    for (page, blocks) in pages.iter().enumerate() {
        let cells: String = blocks
            .iter()
            .map(|b| if b.is_affiliation { '🟩' } else { '⬜' })
            .collect();
        writeln!(w, "page {:>3}  {}", page + 1, cells)?;
    }
    writeln!(w)?;
    Ok(())
}

/// Per-block scores for the pages listed in `region_pages`.
pub fn print_block_breakdown(
    w: &mut dyn Write,
    pages: &[Vec<Block>],
    region_pages: &[usize],
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(
        w,
        "{:>4}  {:>5}  {:<12}  {:>6}  {:>6}  text",
        "page", "block", "decision", "aff", "not"
    )?;
    for &page in region_pages {
        let Some(blocks) = pages.get(page) else {
            continue;
        };
        for block in blocks {
            let decision = if block.is_affiliation {
                "AFFILIATION"
            } else {
                "-"
            };
            let decision = format!("{:<12}", decision);
            let decision = if color.enabled() && block.is_affiliation {
                decision.green().to_string()
            } else {
                decision
            };
            writeln!(
                w,
                "{:>4}  {:>5}  {}  {:>6.3}  {:>6.3}  {}",
                page + 1,
                block.index,
                decision,
                category_score(&block.cats, AFFILIATION),
                category_score(&block.cats, NOT_AFFILIATION),
                truncate(&block.text.replace('\n', " "), 60)
            )?;
        }
    }
    writeln!(w)?;
    Ok(())
}

/// List graph nodes with their kind, then edges.
pub fn print_graph(
    w: &mut dyn Write,
    graph: &AffiliationGraph,
    color: ColorMode,
) -> std::io::Result<()> {
    print_header(w, "NODES", color)?;
    for node in graph.nodes() {
        let kind = format!("{:<13}", node.kind.as_str());
        if color.enabled() {
            let kind = match node.kind {
                NodeKind::Person => kind.cyan().to_string(),
                NodeKind::Organization => kind.green().to_string(),
                NodeKind::Location => kind.yellow().to_string(),
            };
            writeln!(w, "  {} {}", kind, node.id)?;
        } else {
            writeln!(w, "  {} {}", kind, node.id)?;
        }
    }
    writeln!(w)?;

    print_header(w, "EDGES", color)?;
    for edge in graph.edges() {
        if color.enabled() {
            writeln!(
                w,
                "  {} {} {}",
                edge.source,
                format!("-[{}]->", edge.relation).dimmed(),
                edge.target
            )?;
        } else {
            writeln!(w, "  {} -[{}]-> {}", edge.source, edge.relation, edge.target)?;
        }
    }
    writeln!(w)?;
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}
