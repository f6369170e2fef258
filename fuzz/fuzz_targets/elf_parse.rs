#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = elfdelta::formats::elf::ElfParser::parse(data);
    let _ = elfdelta::scan::image_records(data, ".", "<fuzz>", true);
});
