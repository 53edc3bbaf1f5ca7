use aggsource_domain::event::{Event, EventMessage};
use aggsource_macros::event;

#[event]
struct Registered {
    email: String,
}

#[event]
struct Archived;

fn main() {
    assert_eq!(Registered::EVENT_TYPE, "Registered");
    assert_eq!(Archived::EVENT_TYPE, "Archived");

    let registered = Registered {
        email: "a@b.c".to_string(),
    };
    let message = EventMessage::from_event(&registered).unwrap();
    assert_eq!(message.event_type(), "Registered");
    let back: Registered = message.to_event().unwrap();
    assert_eq!(back, registered);
}
