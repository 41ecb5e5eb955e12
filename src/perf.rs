use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// JSON-lines sink for serialization timings and counters. Cloning shares the sink,
/// so one logger can be handed to documents serialized on different threads.
#[derive(Clone)]
pub struct PerfLogger {
    inner: Arc<Mutex<PerfState>>,
}

struct PerfState {
    writer: Box<dyn Write + Send>,
    span_totals: HashMap<String, f64>,
    span_counts: HashMap<String, u64>,
    count_totals: HashMap<String, u64>,
}

impl PerfLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PerfState {
                writer: Box::new(writer),
                span_totals: HashMap::new(),
                span_counts: HashMap::new(),
                count_totals: HashMap::new(),
            })),
        }
    }

    pub fn log_span_ms(&self, name: &str, doc_id: Option<usize>, ms: f64) {
        let json = format!(
            "{{\"type\":\"perf.span\",\"name\":\"{}\",\"doc_id\":{},\"unit\":\"ms\",\"ms\":{:.3}}}",
            json_escape(name),
            doc_field(doc_id),
            ms
        );
        if let Ok(mut state) = self.inner.lock() {
            *state.span_totals.entry(name.to_string()).or_insert(0.0) += ms;
            let entry = state.span_counts.entry(name.to_string()).or_insert(0);
            *entry = entry.saturating_add(1);
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn log_counts(&self, name: &str, doc_id: Option<usize>, counts: &[(&str, u64)]) {
        let mut out = format!(
            "{{\"type\":\"perf.counts\",\"name\":\"{}\",\"doc_id\":{},\"counts\":{{",
            json_escape(name),
            doc_field(doc_id)
        );
        for (idx, (key, value)) in counts.iter().enumerate() {
            if idx > 0 {
                out.push(',');
            }
            out.push_str(&format!("\"{}\":{}", json_escape(key), value));
        }
        out.push_str("}}");
        if let Ok(mut state) = self.inner.lock() {
            for (key, value) in counts {
                let entry = state.count_totals.entry(format!("{name}.{key}")).or_insert(0);
                *entry = entry.saturating_add(*value);
            }
            let _ = writeln!(state.writer, "{out}");
        }
    }

    /// Writes one `perf.summary` record with the running totals, then flushes.
    pub fn emit_summary(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let mut spans: Vec<(&String, &f64)> = state.span_totals.iter().collect();
            spans.sort_by(|a, b| a.0.cmp(b.0));
            let mut counts: Vec<(&String, &u64)> = state.count_totals.iter().collect();
            counts.sort_by(|a, b| a.0.cmp(b.0));

            let mut out = String::from("{\"type\":\"perf.summary\",\"spans\":{");
            for (idx, (name, ms)) in spans.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                let count = state.span_counts.get(*name).copied().unwrap_or(1);
                out.push_str(&format!(
                    "\"{}\":{{\"ms\":{:.3},\"count\":{}}}",
                    json_escape(name),
                    ms,
                    count
                ));
            }
            out.push_str("},\"counts\":{");
            for (idx, (name, value)) in counts.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push_str(&format!("\"{}\":{}", json_escape(name), value));
            }
            out.push_str("}}");
            let _ = writeln!(state.writer, "{out}");
            let _ = state.writer.flush();
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

impl fmt::Debug for PerfLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerfLogger").finish_non_exhaustive()
    }
}

fn doc_field(doc_id: Option<usize>) -> String {
    doc_id
        .map(|v| v.to_string())
        .unwrap_or_else(|| "null".to_string())
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// In-memory writer whose contents stay readable after the logger takes ownership.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        pub(crate) fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn spans_and_counts_are_json_lines() {
        let buf = SharedBuf::default();
        let logger = PerfLogger::from_writer(buf.clone());
        logger.log_span_ms("serialize", Some(2), 1.5);
        logger.log_counts("serialize", None, &[("objects", 3), ("bytes", 120)]);
        let text = buf.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "{\"type\":\"perf.span\",\"name\":\"serialize\",\"doc_id\":2,\"unit\":\"ms\",\"ms\":1.500}"
        );
        assert_eq!(
            lines[1],
            "{\"type\":\"perf.counts\",\"name\":\"serialize\",\"doc_id\":null,\"counts\":{\"objects\":3,\"bytes\":120}}"
        );
    }

    #[test]
    fn summary_accumulates_totals() {
        let buf = SharedBuf::default();
        let logger = PerfLogger::from_writer(buf.clone());
        logger.log_span_ms("xref", None, 1.0);
        logger.log_span_ms("xref", None, 2.0);
        logger.log_counts("doc", None, &[("objects", 2)]);
        logger.log_counts("doc", None, &[("objects", 5)]);
        logger.emit_summary();
        let text = buf.text();
        let summary = text.lines().last().unwrap();
        assert!(summary.contains("\"xref\":{\"ms\":3.000,\"count\":2}"));
        assert!(summary.contains("\"doc.objects\":7"));
    }

    #[test]
    fn escapes_quotes_in_names() {
        assert_eq!(json_escape("a\"b\\c\n"), "a\\\"b\\\\c\\n");
    }
}
