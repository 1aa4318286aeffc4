/// One queue touched by a queue change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEvent {
    pub queue_id: i32,
    /// `-1` when the device did not report an update id.
    pub update_id: i32,
    pub curated: Option<bool>,
}

impl QueueEvent {
    pub fn new(queue_id: i32, update_id: i32) -> Self {
        Self {
            queue_id,
            update_id,
            curated: None,
        }
    }
}
