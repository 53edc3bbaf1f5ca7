use aggsource_domain::event::Event;
use aggsource_macros::event;

#[event(event_type = "Moved")]
struct Moved(i32, i32);

fn main() {
    let m = Moved(1, 2);
    assert_eq!(m.clone(), Moved(1, 2));
    assert_eq!(<Moved as Event>::EVENT_TYPE, "Moved");
}
