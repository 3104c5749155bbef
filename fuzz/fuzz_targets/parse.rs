#![no_main]

use libfuzzer_sys::fuzz_target;
use dotlayout::ByteBuffer;

fuzz_target!(|data: &[u8]| {
    if let Ok(tree) = dotlayout::parse(ByteBuffer::from_mem(data.to_vec())) {
        let _ = tree.check_coverage();
        let _ = dotlayout::diff(&tree, &tree);
    }
});
