use icalendar::{Calendar, Component, Event, EventLike, EventStatus};

use crate::models::SessionStatus;
use crate::views::SessionView;

#[derive(Clone)]
pub struct ICalExporter {
    title: String,
}

impl ICalExporter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    pub fn generate(&self, sessions: &[SessionView]) -> Vec<u8> {
        if sessions.is_empty() {
            return Vec::new();
        }

        let mut calendar = Calendar::new();
        calendar.name(&self.title);

        for session in sessions {
            let mut event = Event::new();
            event.summary(session.class_name());
            event.starts(session.start_time);
            event.ends(session.end_time);
            event.location(&session.room);
            event.description(&format!(
                "Instructor: {}\nEnrolled: {}/{}\nStatus: {}",
                session.instructor_name(),
                session.stats.attendance.total,
                session.max_capacity,
                session.status.as_str()
            ));
            if session.status == SessionStatus::Cancelled {
                event.status(EventStatus::Cancelled);
            }
            event.uid(&format!("{}@gym-scheduler", session.id));
            calendar.push(event);
        }

        calendar.to_string().into_bytes()
    }
}
