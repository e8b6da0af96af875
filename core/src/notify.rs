/// A channel that operators receive run results on. Delivery is
/// fire-and-forget: failures are logged by [`Notifiers`] and never affect
/// the run.
pub trait Notifier {
    fn name(&self) -> &str;

    fn send_message(&self, message: &str) -> anyhow::Result<()>;

    fn send_reward_message(
        &self,
        stats: &[String],
        run_summary: &str,
        account: &str,
    ) -> anyhow::Result<()> {
        self.send_message(&format_reward_message(stats, run_summary, account))
    }
}

pub fn format_reward_message(stats: &[String], run_summary: &str, account: &str) -> String {
    let mut out = format!("Rewards for {account}\n");
    for line in stats {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("Last run: ");
    out.push_str(run_summary);
    out
}

#[derive(Default)]
pub struct Notifiers {
    inner: Vec<Box<dyn Notifier>>,
}

impl Notifiers {
    pub fn new(inner: Vec<Box<dyn Notifier>>) -> Self {
        Self { inner }
    }

    pub fn push(&mut self, notifier: Box<dyn Notifier>) {
        self.inner.push(notifier);
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn send_message(&self, message: &str) {
        for n in &self.inner {
            if let Err(e) = n.send_message(message) {
                tracing::warn!(notifier = n.name(), "notification failed: {e:#}");
            }
        }
    }

    pub fn send_reward_message(&self, stats: &[String], run_summary: &str, account: &str) {
        for n in &self.inner {
            if let Err(e) = n.send_reward_message(stats, run_summary, account) {
                tracing::warn!(notifier = n.name(), "reward notification failed: {e:#}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Failing;

    impl Notifier for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn send_message(&self, _message: &str) -> anyhow::Result<()> {
            anyhow::bail!("channel down")
        }
    }

    struct Capture(Rc<RefCell<Vec<String>>>);

    impl Notifier for Capture {
        fn name(&self) -> &str {
            "capture"
        }
        fn send_message(&self, message: &str) -> anyhow::Result<()> {
            self.0.borrow_mut().push(message.to_string());
            Ok(())
        }
    }

    #[test]
    fn failing_channel_does_not_block_others() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let notifiers = Notifiers::new(vec![Box::new(Failing), Box::new(Capture(seen.clone()))]);
        notifiers.send_reward_message(&["earned: 50".to_string()], "done", "a@example.com");
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("a@example.com"));
        assert!(seen[0].contains("earned: 50"));
        assert!(seen[0].ends_with("Last run: done"));
    }
}
