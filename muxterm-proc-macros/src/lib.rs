#![deny(clippy::all, clippy::if_not_else, clippy::enum_glob_use)]

extern crate proc_macro;

use std::iter::Peekable;

use proc_macro2::TokenTree::{Group, Literal, Punct};
use proc_macro2::{token_stream, TokenStream, TokenTree};
use quote::quote;

/// Generate a `const fn` returning the parser's state-change table.
///
/// The input is a function name followed by a block per origin state,
/// where each entry maps a byte (or inclusive byte range) to a
/// `(TargetState, Action)` pair:
///
/// ```ignore
/// generate_state_changes!(state_changes, {
///     Escape {
///         0x5b => (CsiEntry, None),
///         0x30..=0x4f => (Ground, EscDispatch),
///     },
/// });
/// ```
///
/// Entries not listed stay zero, which the parser treats as "consult
/// the `Anywhere` row".
#[proc_macro]
pub fn generate_state_changes(item: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let item: TokenStream = item.into();
    let mut iter = item.into_iter().peekable();

    // Output function name, then a comma, then the table body.
    let fn_name = iter.next().unwrap();
    expect_punct(&mut iter, ',');

    let assignments = states_stream(&mut iter);

    quote!(
        const fn #fn_name() -> [[u8; 256]; 16] {
            let mut table = [[0; 256]; 16];

            #assignments

            table
        }
    )
    .into()
}

/// Emit the assignment statements for every origin state block.
fn states_stream(iter: &mut impl Iterator<Item = TokenTree>) -> TokenStream {
    let mut states = next_group(iter).into_iter().peekable();

    let mut tokens = quote!();
    while states.peek().is_some() {
        tokens.extend(state_entry_stream(&mut states));

        // Allow trailing comma.
        optional_punct(&mut states, ',');
    }
    tokens
}

/// Emit the assignment statements for one origin state block.
fn state_entry_stream(iter: &mut Peekable<token_stream::IntoIter>) -> TokenStream {
    let state = iter.next().unwrap();

    let mut changes = next_group(iter).into_iter().peekable();

    let mut tokens = quote!();
    while changes.peek().is_some() {
        tokens.extend(change_stream(&mut changes, &state));

        optional_punct(&mut changes, ',');
    }
    tokens
}

/// Emit the assignments for a single byte (or byte-range) mapping.
fn change_stream(
    iter: &mut Peekable<token_stream::IntoIter>,
    state: &TokenTree,
) -> TokenStream {
    let start = next_usize(iter);

    let end = if optional_punct(iter, '.') {
        // Inclusive range end.
        expect_punct(iter, '.');
        expect_punct(iter, '=');
        next_usize(iter)
    } else {
        start
    };

    expect_punct(iter, '=');
    expect_punct(iter, '>');

    let mut target = next_group(iter).into_iter().peekable();

    let mut tokens = quote!();
    while target.peek().is_some() {
        let (target_state, target_action) = target_change(&mut target);

        for byte in start..=end {
            tokens.extend(quote!(
                table[State::#state as usize][#byte] =
                    pack(State::#target_state, Action::#target_action);
            ));
        }
    }
    tokens
}

/// Read the `(State, Action)` pair of a mapping.
fn target_change(iter: &mut Peekable<token_stream::IntoIter>) -> (TokenTree, TokenTree) {
    let target_state = iter.next().unwrap();

    expect_punct(iter, ',');

    let target_action = iter.next().unwrap();

    (target_state, target_action)
}

fn optional_punct(iter: &mut Peekable<token_stream::IntoIter>, c: char) -> bool {
    match iter.peek() {
        Some(Punct(punct)) if punct.as_char() == c => iter.next().is_some(),
        _ => false,
    }
}

/// # Panics
///
/// Panics if the next token is not the expected punctuation.
fn expect_punct(iter: &mut impl Iterator<Item = TokenTree>, c: char) {
    match iter.next() {
        Some(Punct(ref punct)) if punct.as_char() == c => (),
        token => panic!("Expected punctuation '{}', but got {:?}", c, token),
    }
}

/// # Panics
///
/// Panics if the next token is not a hex or decimal literal.
fn next_usize(iter: &mut impl Iterator<Item = TokenTree>) -> usize {
    match iter.next() {
        Some(Literal(literal)) => {
            let literal = literal.to_string();
            if let Some(hex) = literal.strip_prefix("0x") {
                usize::from_str_radix(hex, 16).unwrap()
            } else {
                literal.parse::<usize>().unwrap()
            }
        }
        token => panic!("Expected literal, but got {:?}", token),
    }
}

/// # Panics
///
/// Panics if the next token is not a group.
fn next_group(iter: &mut impl Iterator<Item = TokenTree>) -> TokenStream {
    match iter.next() {
        Some(Group(group)) => group.stream(),
        token => panic!("Expected group, but got {:?}", token),
    }
}
