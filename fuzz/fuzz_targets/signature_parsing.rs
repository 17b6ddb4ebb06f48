#![no_main]

use jnullness::types::signatures::{ClassSignature, FieldSignature, MethodSignature};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(signature) = data.parse::<MethodSignature>() {
        let reparsed = signature.to_string().parse::<MethodSignature>();
        assert_eq!(reparsed.as_ref(), Ok(&signature));
    }
    let _ = data.parse::<FieldSignature>();
    let _ = data.parse::<ClassSignature>();
});
