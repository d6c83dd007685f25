use crate::api::types::{Model, OptimizeResponse, UsageStats};
use crate::core::check::TestResult;
use crate::core::summary::TestSummary;
use crate::store::SavedPrompt;
use serde::Serialize;

#[derive(Serialize)]
pub struct RunReport<'a> {
    pub results: &'a [TestResult],
    pub summary: &'a TestSummary,
}

pub fn render_json(results: &[TestResult], summary: &TestSummary) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&RunReport { results, summary })
}

pub fn format_pass_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{r:.1}%"),
        None => "n/a".to_string(),
    }
}

pub fn render_results(results: &[TestResult], summary: &TestSummary) -> String {
    let mut lines = Vec::new();
    for r in results {
        let mark = if r.success { "✅" } else { "❌" };
        lines.push(format!("{mark} {} ({:.1} ms)", r.name, r.duration));
        if !r.success {
            lines.push(format!("     {}", r.message));
        }
    }
    lines.push("-".repeat(50));
    lines.push(format!(
        "Total: {}  Passed: {}  Failed: {}  Pass rate: {}",
        summary.total,
        summary.passed,
        summary.failed,
        format_pass_rate(summary.pass_rate)
    ));
    lines.extend(summary.failed_tests.iter().map(|f| format!("  - {f}")));
    join_lines(lines)
}

pub fn render_models(models: &[Model]) -> String {
    if models.is_empty() {
        return "No models available.\n".to_string();
    }
    let mut lines = Vec::new();
    for m in models {
        let multimodal = if m.supports_multimodal { " [multimodal]" } else { "" };
        lines.push(format!("{:<20} {} ({}){multimodal}", m.model_id, m.model_name, m.provider));
        if !m.capabilities.is_empty() {
            lines.push(format!("{:<20} {}", "", m.capabilities.join(", ")));
        }
    }
    join_lines(lines)
}

pub fn render_examples(model_id: &str, examples: &[String]) -> String {
    if examples.is_empty() {
        return format!("No example tasks for '{model_id}'.\n");
    }
    let mut lines = vec![format!("Example tasks for '{model_id}':")];
    lines.extend(examples.iter().enumerate().map(|(i, e)| format!("  {}. {e}", i + 1)));
    join_lines(lines)
}

pub fn render_optimization(response: &OptimizeResponse) -> String {
    let mut lines = vec![response.optimized_prompt.clone().unwrap_or_default()];
    let tips = response.tips();
    if !tips.is_empty() {
        lines.push(String::new());
        lines.push("Tips:".to_string());
        lines.extend(tips.iter().map(|tip| format!("  • {tip}")));
    }
    if let Some(max_tokens) = response.extra.get("max_tokens") {
        lines.push(String::new());
        lines.push(format!("Max tokens: {max_tokens}"));
    }
    join_lines(lines)
}

pub fn render_history(items: &[SavedPrompt]) -> String {
    if items.is_empty() {
        return "History is empty.\n".to_string();
    }
    let lines = items
        .iter()
        .map(|p| {
            format!(
                "{}  {}  [{}] {}",
                p.id,
                p.timestamp.format("%Y-%m-%d %H:%M"),
                p.model_name,
                truncate(&p.original_input, 60)
            )
        })
        .collect();
    join_lines(lines)
}

pub fn render_stats(stats: &UsageStats) -> String {
    let mut lines = vec![
        format!("Total requests:  {}", stats.total_requests),
        format!("Recent requests: {}", stats.recent_requests_count),
    ];
    if !stats.top_models.is_empty() {
        lines.push("Top models:".to_string());
        lines.extend(stats.top_models.iter().map(|(model, count)| format!("  {model:<20} {count}")));
    }
    join_lines(lines)
}

fn join_lines(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    }
}
