#![no_main]

use arbitrary::Arbitrary;
use ci_task_dispatcher::event::decode_payload;
use ci_task_dispatcher::router::{route, Action};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct HookInput<'a> {
    event_type: &'a str,
    body: &'a [u8],
}

fuzz_target!(|input: HookInput<'_>| {
    let Ok(payload) = decode_payload(input.body) else {
        return;
    };

    if let Ok(Some(action)) = route(input.event_type, &payload) {
        // A routed action always carries the category it was routed from.
        assert_eq!(action.kind().label(), input.event_type);
        let expected_start = matches!(action, Action::StartTask(_));
        assert_eq!(expected_start, input.event_type == "Job Hook");
    }
});
