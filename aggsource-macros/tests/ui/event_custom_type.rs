use aggsource_domain::event::Event;
use aggsource_macros::event;

#[event(event_type = "orders.placed.v2")]
struct OrderPlaced {
    order_id: String,
    total: u64,
}

fn main() {
    assert_eq!(OrderPlaced::EVENT_TYPE, "orders.placed.v2");
}
