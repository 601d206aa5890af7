fn main() {
    println!("Run `cargo test -p name-compat` to execute name and message compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use chunkfetch_protocol::addressing::{base_name, encode_request};
    use chunkfetch_protocol::constants::DOMAIN_PREFIX;
    use chunkfetch_protocol::{Command, CommandMatching, Message, Request, ResourceName};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values.
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  rust:    {reserialized}"
        );
    }

    fn prefix() -> ResourceName {
        DOMAIN_PREFIX.parse().unwrap()
    }

    // --- Name text form ---

    #[test]
    fn fixture_names() {
        let cases = load_fixture("names.json");
        for case in cases.as_array().unwrap() {
            let input = case["input"].as_str().unwrap();
            let name: ResourceName = input
                .parse()
                .unwrap_or_else(|e| panic!("failed to parse {input}: {e}"));

            assert_eq!(name.to_string(), case["canonical"].as_str().unwrap(), "{input}");

            let request = Request::decode(&name, &prefix(), CommandMatching::Exact).unwrap();
            assert_eq!(request.command.keyword(), case["command"].as_str().unwrap());
            assert_eq!(request.command.target(), case["target"].as_str());
            assert_eq!(request.chunk_index, case["chunk"].as_u64().unwrap());

            // Re-encoding yields the canonical form.
            assert_eq!(request.encode(&prefix()), name);
        }
    }

    #[test]
    fn fixture_invalid_names() {
        let cases = load_fixture("invalid_names.json");
        for case in cases.as_array().unwrap() {
            let input = case.as_str().unwrap();
            assert!(
                input.parse::<ResourceName>().is_err(),
                "expected {input} to be rejected"
            );
        }
    }

    #[test]
    fn fixture_names_cache_key() {
        let cases = load_fixture("names.json");
        for case in cases.as_array().unwrap() {
            let name: ResourceName = case["input"].as_str().unwrap().parse().unwrap();
            let request = Request::decode(&name, &prefix(), CommandMatching::Exact).unwrap();
            assert_eq!(base_name(&name), encode_request(&prefix(), &request.command));
        }
    }

    #[test]
    fn fixture_list_request() {
        let name = encode_request(&prefix(), &Command::List).with_chunk(0);
        let fixture = load_fixture("interest.json");
        assert_eq!(name.to_string(), fixture["name"].as_str().unwrap());
    }

    // --- Message JSON ---

    #[test]
    fn fixture_interest() {
        roundtrip_test::<Message>("interest.json");
    }

    #[test]
    fn fixture_content() {
        roundtrip_test::<Message>("content.json");

        let Message::Content(content) =
            serde_json::from_value::<Message>(load_fixture("content.json")).unwrap()
        else {
            panic!("expected content");
        };
        assert_eq!(&*content.payload, b"hello world");
        assert_eq!(content.chunk_index().unwrap(), 1);
        assert_eq!(content.final_chunk, 2);
    }

    #[test]
    fn fixture_content_empty() {
        roundtrip_test::<Message>("content_empty.json");
    }
}
