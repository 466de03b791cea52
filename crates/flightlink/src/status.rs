//! Status panels: read-only views over ingestion counters.
//!
//! Every panel answers the same question, "what is your status line?", from a
//! [`CounterSnapshot`]. Panels never write back into the counters.

use std::collections::VecDeque;
use std::net::SocketAddr;

use crate::counters::CounterSnapshot;

/// Glyphs used by the altitude sparkline, lowest first.
const SPARK_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Default number of samples kept by an [`AltitudeChart`].
pub const DEFAULT_CHART_CAPACITY: usize = 32;

/// Link state shown by the connection panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No link and not waiting for one.
    #[default]
    Disconnected,
    /// Waiting for a sender on this address.
    Listening(SocketAddr),
    /// Receiving from at least one sender.
    Connected {
        /// Most recent peer.
        peer: SocketAddr,
        /// Number of open sessions.
        sessions: usize,
    },
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Listening(addr) => write!(f, "listening on {addr}"),
            Self::Connected { peer, sessions } => {
                write!(f, "connected to {peer} ({sessions} open)")
            }
        }
    }
}

/// Rolling window of recent altitude samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AltitudeChart {
    capacity: usize,
    samples: VecDeque<(u32, f64)>,
}

impl Default for AltitudeChart {
    fn default() -> Self {
        Self::new(DEFAULT_CHART_CAPACITY)
    }
}

impl AltitudeChart {
    /// Create a chart keeping at most `capacity` samples (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Altitudes currently in the window, oldest first.
    pub fn altitudes(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|(_, altitude)| *altitude)
    }

    /// Record the snapshot's last record unless it is already the newest sample.
    pub fn observe(&mut self, snapshot: &CounterSnapshot) {
        let Some(record) = &snapshot.last_telemetry else {
            return;
        };
        let sample = (record.sequence(), record.readings().altitude);
        if self.samples.back() == Some(&sample) {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    fn sparkline(&self) -> String {
        let (min, max) = self
            .altitudes()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), a| {
                (lo.min(a), hi.max(a))
            });
        let span = max - min;
        let top = SPARK_GLYPHS.len() - 1;
        self.altitudes()
            .map(|altitude| {
                if span > 0.0 {
                    #[allow(
                        clippy::cast_possible_truncation,
                        clippy::cast_sign_loss,
                        clippy::cast_precision_loss
                    )]
                    let index = (((altitude - min) / span) * top as f64).round() as usize;
                    SPARK_GLYPHS[index.min(top)]
                } else {
                    SPARK_GLYPHS[0]
                }
            })
            .collect()
    }
}

/// One status view. Each variant renders a single line.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusPanel {
    /// Received, sent, and dropped totals.
    Counter,
    /// Link state.
    Connection(ConnectionState),
    /// Recent altitude trend.
    Chart(AltitudeChart),
}

impl StatusPanel {
    /// The standard panel set: counters, connection, and chart.
    #[must_use]
    pub fn standard_set(state: ConnectionState) -> Vec<StatusPanel> {
        vec![
            Self::Counter,
            Self::Connection(state),
            Self::Chart(AltitudeChart::default()),
        ]
    }

    /// Short title for the panel.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Counter => "counters",
            Self::Connection(_) => "link",
            Self::Chart(_) => "altitude",
        }
    }

    /// Update panel-local state from a new snapshot.
    pub fn refresh(&mut self, snapshot: &CounterSnapshot) {
        if let Self::Chart(chart) = self {
            chart.observe(snapshot);
        }
    }

    /// Update the link state shown by a connection panel. Other panels ignore it.
    pub fn set_connection(&mut self, state: ConnectionState) {
        if let Self::Connection(current) = self {
            *current = state;
        }
    }

    /// Produce the panel's status line.
    #[must_use]
    pub fn render(&self, snapshot: &CounterSnapshot) -> String {
        let body = match self {
            Self::Counter => {
                let mut line = format!(
                    "received={} sent={} dropped={}",
                    snapshot.received, snapshot.sent, snapshot.dropped
                );
                if let Some(record) = &snapshot.last_telemetry {
                    line.push_str(&format!(
                        " last={}#{}",
                        record.tail_number(),
                        record.sequence()
                    ));
                }
                line
            }
            Self::Connection(state) => state.to_string(),
            Self::Chart(chart) => match &snapshot.last_telemetry {
                Some(record) if chart.samples.is_empty() => {
                    format!("{:.1}", record.readings().altitude)
                }
                Some(record) => {
                    format!("{} {:.1}", chart.sparkline(), record.readings().altitude)
                }
                None => "no data".to_string(),
            },
        };
        format!("[{}] {}", self.title(), body)
    }
}

/// Refresh every panel from `snapshot` and render them, one line each.
pub fn render_panels(panels: &mut [StatusPanel], snapshot: &CounterSnapshot) -> String {
    let mut report = String::new();
    for panel in panels {
        panel.refresh(snapshot);
        report.push_str(&panel.render(snapshot));
        report.push('\n');
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::IngestionCounters;
    use crate::codec::Encoder;

    fn line_with_altitude(altitude: f64) -> String {
        format!("7_8_2018 19:35:21,-0.79,0.04,0.02,2154.0,{altitude},0.02,0.001")
    }

    fn fed_counters(altitudes: &[f64]) -> IngestionCounters {
        let counters = IngestionCounters::new();
        let encoder = Encoder::new("C-FGAX").unwrap();
        for altitude in altitudes {
            let frame = encoder.encode(&line_with_altitude(*altitude)).unwrap();
            assert!(counters.process_packet(&frame));
        }
        counters
    }

    #[test]
    fn test_counter_panel_render() {
        let counters = fed_counters(&[1000.0, 1100.0]);
        counters.record_sent();
        counters.process_packet(b"garbage");

        let line = StatusPanel::Counter.render(&counters.snapshot());
        assert_eq!(line, "[counters] received=2 sent=1 dropped=1 last=C-FGAX#1");
    }

    #[test]
    fn test_counter_panel_without_data() {
        let line = StatusPanel::Counter.render(&CounterSnapshot::default());
        assert_eq!(line, "[counters] received=0 sent=0 dropped=0");
    }

    #[test]
    fn test_connection_panel_render() {
        let addr: SocketAddr = "127.0.0.1:5005".parse().unwrap();
        let mut panel = StatusPanel::Connection(ConnectionState::Listening(addr));
        let snapshot = CounterSnapshot::default();
        assert_eq!(panel.render(&snapshot), "[link] listening on 127.0.0.1:5005");

        panel.set_connection(ConnectionState::Connected {
            peer: addr,
            sessions: 1,
        });
        assert_eq!(
            panel.render(&snapshot),
            "[link] connected to 127.0.0.1:5005 (1 open)"
        );

        panel.set_connection(ConnectionState::Disconnected);
        assert_eq!(panel.render(&snapshot), "[link] disconnected");
    }

    #[test]
    fn test_set_connection_ignored_by_other_panels() {
        let mut panel = StatusPanel::Counter;
        panel.set_connection(ConnectionState::Disconnected);
        assert_eq!(panel, StatusPanel::Counter);
    }

    #[test]
    fn test_chart_observes_each_record_once() {
        let counters = fed_counters(&[1000.0]);
        let mut chart = AltitudeChart::new(4);
        chart.observe(&counters.snapshot());
        chart.observe(&counters.snapshot());
        assert_eq!(chart.altitudes().collect::<Vec<_>>(), vec![1000.0]);
    }

    #[test]
    fn test_chart_is_bounded() {
        let counters = IngestionCounters::new();
        let encoder = Encoder::new("C-FGAX").unwrap();
        let mut chart = AltitudeChart::new(3);
        for altitude in [1.0, 2.0, 3.0, 4.0, 5.0] {
            let frame = encoder.encode(&line_with_altitude(altitude)).unwrap();
            counters.process_packet(&frame);
            chart.observe(&counters.snapshot());
        }
        assert_eq!(chart.altitudes().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_chart_panel_render() {
        let counters = IngestionCounters::new();
        let encoder = Encoder::new("C-FGAX").unwrap();
        let mut panel = StatusPanel::Chart(AltitudeChart::new(8));
        assert_eq!(panel.render(&counters.snapshot()), "[altitude] no data");

        for altitude in [0.0, 50.0, 100.0] {
            let frame = encoder.encode(&line_with_altitude(altitude)).unwrap();
            counters.process_packet(&frame);
            panel.refresh(&counters.snapshot());
        }
        assert_eq!(panel.render(&counters.snapshot()), "[altitude] ▁▅█ 100.0");
    }

    #[test]
    fn test_flat_chart_uses_lowest_glyph() {
        let counters = fed_counters(&[500.0]);
        let mut panel = StatusPanel::Chart(AltitudeChart::new(8));
        panel.refresh(&counters.snapshot());
        assert_eq!(panel.render(&counters.snapshot()), "[altitude] ▁ 500.0");
    }

    #[test]
    fn test_render_panels_one_line_each() {
        let counters = fed_counters(&[1000.0]);
        let mut panels = StatusPanel::standard_set(ConnectionState::Disconnected);

        let report = render_panels(&mut panels, &counters.snapshot());
        let lines: Vec<_> = report.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[counters] received=1 sent=0 dropped=0 last=C-FGAX#0",
                "[link] disconnected",
                "[altitude] ▁ 1000.0",
            ]
        );
    }

    #[test]
    fn test_standard_set() {
        let panels = StatusPanel::standard_set(ConnectionState::Disconnected);
        let titles: Vec<_> = panels.iter().map(StatusPanel::title).collect();
        assert_eq!(titles, vec!["counters", "link", "altitude"]);
    }
}
