// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![no_main]
#![forbid(unsafe_code)]

use amunchain_staking::core::staking::MsgRegistry;
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Clone, Debug, Arbitrary)]
struct Input {
    selector: u8,
    body: Vec<u8>,
}

fuzz_target!(|inp: Input| {
    let registry = MsgRegistry::standard();
    let urls: Vec<&'static str> = registry.type_urls().copied().collect();
    let url = urls[inp.selector as usize % urls.len()];

    if let Ok(msg) = registry.decode(url, &inp.body) {
        let _ = msg.validate_basic();
        let (url2, bytes) = registry.encode(&msg).expect("decoded message re-encodes");
        assert_eq!(url, url2);
        assert_eq!(registry.decode(url2, &bytes).ok(), Some(msg));
    }
});
