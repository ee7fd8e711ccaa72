#![no_main]

use libfuzzer_sys::fuzz_target;
use sjr_slack::{is_help_request, parse_build_command, ParamNameCase};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);

    for case in [ParamNameCase::Uppercase, ParamNameCase::Preserve] {
        match parse_build_command(&raw, case) {
            Ok(parsed) => {
                if is_help_request(&raw) {
                    assert_eq!(parsed.job_name, "help");
                }
                assert!(!parsed.job_name.is_empty());
                assert!(!parsed.job_name.contains(char::is_whitespace));
                for (name, value) in &parsed.params {
                    assert!(!name.is_empty());
                    assert!(!value.contains(char::is_whitespace));
                }
            }
            Err(_) => assert!(raw.split_whitespace().next().is_none()),
        }
    }
});
