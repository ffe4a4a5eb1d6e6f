
use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::event::{CancelFlag, Cancellable, Event, FnSubscriber, Priority, Subscriber};

/// Cancellable payload used across the event tests
#[derive(Debug, Default)]
pub(crate) struct TestEvent {
    pub name: &'static str,
    pub cancel: CancelFlag,
}

impl TestEvent {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cancel: CancelFlag::default(),
        }
    }
}

impl Event for TestEvent {
    fn name(&self) -> &str {
        self.name
    }

    fn as_cancellable(&self) -> Option<&dyn Cancellable> {
        Some(&self.cancel)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Payload without the cancellation capability
#[derive(Debug)]
pub(crate) struct PlainEvent;

impl Event for PlainEvent {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) type CallLog = Arc<Mutex<Vec<String>>>;

pub(crate) fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub(crate) fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// What a recording subscriber does to the cancellation flag after logging
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Act {
    Nothing,
    Cancel,
    Uncancel,
    Fail,
}

/// Subscriber that appends `label` to `log` and then performs `act`
pub(crate) fn recorder(log: &CallLog, label: &str, priority: Priority, act: Act) -> Arc<FnSubscriber> {
    recorder_builder(log, label, priority, act).build()
}

pub(crate) fn recorder_builder(
    log: &CallLog,
    label: &str,
    priority: Priority,
    act: Act,
) -> crate::event::FnSubscriberBuilder {
    let log = Arc::clone(log);
    let label_owned = label.to_string();
    FnSubscriber::builder(move |_caller, event| {
        log.lock().unwrap().push(label_owned.clone());
        match act {
            Act::Nothing => {}
            Act::Cancel => event.as_cancellable().expect("cancellable payload").set_cancelled(true),
            Act::Uncancel => event.as_cancellable().expect("cancellable payload").set_cancelled(false),
            Act::Fail => return Err(format!("{} failed", label_owned).into()),
        }
        Ok(())
    })
    .name(label)
    .priority(priority)
}

pub(crate) fn as_subscriber<S: Subscriber + 'static>(subscriber: &Arc<S>) -> Arc<dyn Subscriber> {
    subscriber.clone()
}

#[cfg(test)]
mod tests {
    use crate::event::Priority;

    #[test]
    fn test_priority_default() {
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn test_priority_order_matches_declaration() {
        let mut shuffled = vec![
            Priority::Watcher,
            Priority::Low,
            Priority::First,
            Priority::Last,
            Priority::Normal,
            Priority::High,
        ];
        shuffled.sort();
        assert_eq!(shuffled, Priority::ALL.to_vec());
        assert!(Priority::Last < Priority::Watcher);
        assert!(Priority::Watcher.is_watcher());
        assert!(!Priority::Last.is_watcher());
    }

    #[test]
    fn test_priority_parse_and_display() {
        for priority in Priority::ALL {
            let parsed: Priority = priority.to_string().parse().unwrap();
            assert_eq!(parsed, priority);
        }
        assert_eq!(" HIGH ".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }
}
