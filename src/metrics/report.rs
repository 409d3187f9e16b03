//! Baseline/optimized comparison aggregation and rendering.

use std::collections::BTreeMap;

use super::collector::MetricEvent;

/// Per-scenario totals for the two measurement conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioComparison {
    pub scenario: String,
    pub baseline_total_tokens: u64,
    pub optimized_total_tokens: u64,
    pub baseline_tool_calls: usize,
    pub optimized_tool_calls: usize,
}

impl ScenarioComparison {
    /// Fractional token reduction, 0 when there is no baseline to compare
    /// against. Negative when the optimized condition did worse.
    pub fn reduction(&self) -> f64 {
        if self.baseline_total_tokens == 0 {
            return 0.0;
        }
        (self.baseline_total_tokens as f64 - self.optimized_total_tokens as f64)
            / self.baseline_total_tokens as f64
    }

    fn add(&mut self, event: &MetricEvent) {
        if event.baseline {
            self.baseline_total_tokens += event.total_tokens();
            self.baseline_tool_calls += 1;
        } else {
            self.optimized_total_tokens += event.total_tokens();
            self.optimized_tool_calls += 1;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonReport {
    /// One row per scenario, ordered by scenario label.
    pub scenarios: Vec<ScenarioComparison>,
    pub baseline_total_tokens: u64,
    pub optimized_total_tokens: u64,
    pub baseline_tool_calls: usize,
    pub optimized_tool_calls: usize,
}

impl ComparisonReport {
    pub fn from_events(events: &[MetricEvent]) -> Self {
        let mut grouped: BTreeMap<&str, ScenarioComparison> = BTreeMap::new();

        for event in events {
            let entry = grouped.entry(&event.scenario).or_default();
            if entry.scenario.is_empty() {
                entry.scenario = event.scenario.clone();
            }
            entry.add(event);
        }

        let mut report = Self::default();
        for comparison in grouped.into_values() {
            report.baseline_total_tokens += comparison.baseline_total_tokens;
            report.optimized_total_tokens += comparison.optimized_total_tokens;
            report.baseline_tool_calls += comparison.baseline_tool_calls;
            report.optimized_tool_calls += comparison.optimized_tool_calls;
            report.scenarios.push(comparison);
        }
        report
    }

    /// Grand-total reduction across all scenarios, same formula as per
    /// scenario applied to the summed totals.
    pub fn total_reduction(&self) -> f64 {
        if self.baseline_total_tokens == 0 {
            return 0.0;
        }
        (self.baseline_total_tokens as f64 - self.optimized_total_tokens as f64)
            / self.baseline_total_tokens as f64
    }

    /// Human-readable comparison table judged against `target`, a
    /// fractional improvement goal.
    pub fn render(&self, target: f64) -> String {
        if self.scenarios.is_empty() {
            return "No metrics recorded yet.".to_string();
        }

        let mut out = String::new();
        out.push_str(&format!("{}\n", "=".repeat(70)));
        out.push_str("TOKEN EFFICIENCY REPORT\n");
        out.push_str(&format!("{}\n", "=".repeat(70)));

        for row in &self.scenarios {
            out.push_str(&format!("\n{}\n", row.scenario.to_uppercase()));
            out.push_str(&format!("{}\n", "-".repeat(40)));
            out.push_str(&format!(
                "  Baseline:  {:>6} tokens ({} calls)\n",
                row.baseline_total_tokens, row.baseline_tool_calls
            ));
            out.push_str(&format!(
                "  Optimized: {:>6} tokens ({} calls)\n",
                row.optimized_total_tokens, row.optimized_tool_calls
            ));
            out.push_str(&format!(
                "  Reduction: {:>5.1}%\n",
                row.reduction() * 100.0
            ));
        }

        out.push_str(&format!("\n{}\n", "=".repeat(70)));
        out.push_str("SUMMARY\n");
        out.push_str(&format!("{}\n", "=".repeat(70)));
        out.push_str(&format!(
            "\n  Total baseline tokens:  {:>8}\n",
            self.baseline_total_tokens
        ));
        out.push_str(&format!(
            "  Total optimized tokens: {:>8}\n",
            self.optimized_total_tokens
        ));
        out.push_str(&format!(
            "  Overall reduction:      {:>7.1}%\n",
            self.total_reduction() * 100.0
        ));

        let status = if self.total_reduction() >= target {
            "PASS"
        } else {
            "FAIL"
        };
        out.push_str(&format!(
            "\n  STATUS: {} (target: >{:.0}%)\n",
            status,
            target * 100.0
        ));

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(scenario: &str, total: u64, baseline: bool) -> MetricEvent {
        MetricEvent::new("Tool", scenario, total, 0, baseline)
    }

    #[test]
    fn test_reference_reduction() {
        let events = vec![
            event("file-discovery", 800, true),
            event("file-discovery", 200, false),
        ];
        let report = ComparisonReport::from_events(&events);

        assert_eq!(report.scenarios.len(), 1);
        let row = &report.scenarios[0];
        assert_eq!(row.baseline_total_tokens, 800);
        assert_eq!(row.optimized_total_tokens, 200);
        assert!((row.reduction() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_grand_total_reference_figures() {
        // 12,450 baseline vs 3,330 optimized across two scenarios.
        let events = vec![
            event("content-search", 8_000, true),
            event("content-search", 2_000, false),
            event("codebase-explore", 4_450, true),
            event("codebase-explore", 1_330, false),
        ];
        let report = ComparisonReport::from_events(&events);

        assert_eq!(report.baseline_total_tokens, 12_450);
        assert_eq!(report.optimized_total_tokens, 3_330);
        assert!((report.total_reduction() - 0.7325).abs() < 0.001);
    }

    #[test]
    fn test_zero_baseline_reduction_is_zero() {
        let events = vec![event("new-scenario", 500, false)];
        let report = ComparisonReport::from_events(&events);

        assert_eq!(report.scenarios[0].reduction(), 0.0);
        assert_eq!(report.total_reduction(), 0.0);
    }

    #[test]
    fn test_tokens_in_and_out_are_summed() {
        let events = vec![MetricEvent::new("Grep", "content-search", 100, 200, true)];
        let report = ComparisonReport::from_events(&events);
        assert_eq!(report.scenarios[0].baseline_total_tokens, 300);
        assert_eq!(report.scenarios[0].baseline_tool_calls, 1);
    }

    #[test]
    fn test_scenarios_ordered_by_label() {
        let events = vec![
            event("zeta", 10, true),
            event("alpha", 10, true),
            event("mid", 10, true),
        ];
        let report = ComparisonReport::from_events(&events);
        let labels: Vec<_> = report.scenarios.iter().map(|s| s.scenario.as_str()).collect();
        assert_eq!(labels, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_render_includes_status() {
        let events = vec![
            event("file-discovery", 800, true),
            event("file-discovery", 200, false),
        ];
        let report = ComparisonReport::from_events(&events);
        let rendered = report.render(0.40);

        assert!(rendered.contains("FILE-DISCOVERY"));
        assert!(rendered.contains("75.0%"));
        assert!(rendered.contains("STATUS: PASS"));
    }

    #[test]
    fn test_render_empty() {
        let report = ComparisonReport::from_events(&[]);
        assert_eq!(report.render(0.4), "No metrics recorded yet.");
    }
}
