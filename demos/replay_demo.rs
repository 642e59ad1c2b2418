//! Replay a short article and video trace and print the resulting profile

fn main() {
    let trace = r#"
{"at":"2024-01-15T14:00:00Z","signal":"open","itemId":"a1","itemType":"article"}
{"at":"2024-01-15T14:00:01Z","signal":"visibility","index":1,"tag":"IMG","ratio":0.9}
{"at":"2024-01-15T14:00:02Z","signal":"scroll","scrollTop":600,"scrollHeight":3000,"clientHeight":800}
{"at":"2024-01-15T14:00:04Z","signal":"visibility","index":1,"tag":"IMG","ratio":0.2}
{"at":"2024-01-15T14:00:05Z","signal":"pointer_up","selection":"  thermodynamic arrow of time "}
{"at":"2024-01-15T14:00:09Z","signal":"scroll","scrollTop":2200,"scrollHeight":3000,"clientHeight":800}
{"at":"2024-01-15T14:00:20Z","signal":"close"}
{"at":"2024-01-15T14:00:22Z","signal":"open","itemId":"v1","itemType":"video"}
{"at":"2024-01-15T14:00:30Z","signal":"time_update","currentTime":8,"duration":40}
{"at":"2024-01-15T14:00:31Z","signal":"seeking","targetTime":1}
{"at":"2024-01-15T14:00:40Z","signal":"time_update","currentTime":34,"duration":40}
{"at":"2024-01-15T14:00:41Z","signal":"close","reason":"escape"}
"#;

    match nexus_flux::replay_trace(trace, None, &nexus_flux::EngineConfig::default()) {
        Ok(outcome) => match serde_json::to_string_pretty(&outcome) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error: {e:?}"),
        },
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
