use std::time::Instant;

/// Logs how long each stage of a run takes. Spans nest; a finished span's line is kept under
/// its parent, so the whole breakdown can be reported at the end.
pub struct Timer {
    stack: Vec<Span>,
    results: Vec<String>,
}

struct Span {
    name: String,
    started_at: Instant,
    nested_results: Vec<String>,
}

impl Timer {
    /// Starts the outermost span.
    pub fn new(name: &str) -> Timer {
        let mut timer = Timer {
            stack: Vec::new(),
            results: Vec::new(),
        };
        timer.start(name);
        timer
    }

    pub fn start(&mut self, name: &str) {
        info!("{}...", name);
        self.stack.push(Span {
            name: name.to_string(),
            started_at: Instant::now(),
            nested_results: Vec::new(),
        });
    }

    /// Ends the innermost span, which should be `name`. Returns its elapsed seconds.
    pub fn stop(&mut self, name: &str) -> f64 {
        let span = match self.stack.pop() {
            Some(span) => span,
            None => {
                warn!("Can't stop {}; nothing is running", name);
                return 0.0;
            }
        };
        if span.name != name {
            warn!("Stopping {}, but the innermost span is {}", name, span.name);
        }
        let elapsed = span.started_at.elapsed().as_secs_f64();
        let line = format!("{} took {}", span.name, prettyprint_time(elapsed));
        info!("{}", line);

        let padding = "  ".repeat(self.stack.len());
        let entry = format!("{}- {}", padding, line);
        match self.stack.last_mut() {
            Some(parent) => {
                parent.nested_results.push(entry);
                parent.nested_results.extend(span.nested_results);
            }
            None => {
                self.results.push(entry);
                self.results.extend(span.nested_results);
            }
        }
        elapsed
    }

    /// Stops everything still running and returns one line per span, outermost first.
    pub fn done(mut self) -> Vec<String> {
        while let Some(name) = self.stack.last().map(|span| span.name.clone()) {
            self.stop(&name);
        }
        self.results
    }
}

pub fn prettyprint_time(seconds: f64) -> String {
    format!("{:.4}s", seconds)
}
