//! 字句解析器の性質テスト
//!
//! 1. 任意の入力で panic しない
//! 2. 常に `EndOfFile` ちょうど1つで終わる
//! 3. `Illegal` は `EndOfFile` の直前にしか現れない
//! 4. トークンの開始オフセットと位置は単調増加
//! 5. 同じ入力からは同じトークン列が得られる
//! 6. 既知の正しい断片はエラーにならない

use proptest::prelude::*;

use crate::lexer::{lex, token::TokenKind};

// ============================================================================
// Generators
// ============================================================================

const VALID_FRAGMENTS: &[&str] = &[
    "42",
    "0x1F",
    "0b1010",
    "0o777",
    "3.14",
    "1e+10",
    "2j",
    "\"hello\"",
    "\"\"",
    "'c'",
    "`raw`",
    "true",
    "nil",
    "foo",
    "@builtin",
    "func",
    "mutable",
    "<<=",
    "...",
    "=>",
    "&^",
    "// comment",
    "/* block */",
    "{ }",
];

fn valid_fragment() -> impl Strategy<Value = String> {
    prop::sample::select(VALID_FRAGMENTS).prop_map(std::string::ToString::to_string)
}

fn valid_program() -> impl Strategy<Value = String> {
    prop::collection::vec(valid_fragment(), 1..20).prop_map(|fragments| fragments.join("\n"))
}

fn proptest_config() -> ProptestConfig {
    let default = ProptestConfig::default();
    ProptestConfig {
        cases: default.cases.max(512),
        ..default
    }
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn lexer_never_panics(input in "\\PC{0,500}") {
        let _tokens = lex(&input, "prop.hz");
    }

    #[test]
    fn exactly_one_end_of_file_at_the_end(input in "\\PC{0,500}") {
        let stream = lex(&input, "prop.hz");
        let eofs = stream.iter().filter(|t| t.kind.is_end_of_file()).count();

        prop_assert_eq!(eofs, 1, "input {:?}", input);
        prop_assert_eq!(
            stream.as_slice().last().map(|t| t.kind),
            Some(TokenKind::EndOfFile)
        );
    }

    #[test]
    fn illegal_only_before_end_of_file(input in "\\PC{0,500}") {
        let stream = lex(&input, "prop.hz");
        let len = stream.len();

        for (i, token) in stream.iter().enumerate() {
            if token.kind.is_illegal() {
                prop_assert_eq!(i, len - 2, "input {:?}", input);
            }
        }
    }

    #[test]
    fn offsets_and_locations_are_monotonic(input in "\\PC{0,300}") {
        let stream = lex(&input, "prop.hz");
        let input_len = u32::try_from(input.len()).unwrap_or(u32::MAX);

        for window in stream.as_slice().windows(2) {
            let (prev, next) = (&window[0], &window[1]);
            prop_assert!(prev.start_offset < next.start_offset || next.kind.is_end_of_file());
            prop_assert!(
                (prev.location.line, prev.location.column)
                    <= (next.location.line, next.location.column),
                "{:?} then {:?} for input {:?}",
                prev,
                next,
                input,
            );
        }
        for token in &stream {
            prop_assert!(token.start_offset <= input_len);
        }
    }

    #[test]
    fn lexer_is_deterministic(input in "\\PC{0,200}") {
        prop_assert_eq!(lex(&input, "prop.hz"), lex(&input, "prop.hz"));
    }

    #[test]
    fn valid_programs_lex_cleanly(input in valid_program()) {
        let stream = lex(&input, "prop.hz");

        prop_assert!(stream.illegal().is_none(), "input {:?}", input);
        prop_assert!(stream.diagnostics().is_empty(), "input {:?}", input);
    }
}
