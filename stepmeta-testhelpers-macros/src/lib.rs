//! The `#[test]` attribute re-exported by `stepmeta-testhelpers`.

use unsynn::*;

keyword! {
    KFn = "fn";
}

unsynn! {
    // attributes, visibility and qualifiers ahead of `fn`
    struct Prelude {
        items: Any<Cons<Except<KFn>, TokenTree>>,
    }

    // generics and the argument list, up to the body
    struct Signature {
        items: Any<Cons<Except<BraceGroup>, TokenTree>>,
    }

    struct TestFn {
        prelude: Prelude, _fn: KFn, name: Ident,
        signature: Signature, body: BraceGroup
    }
}

impl quote::ToTokens for Prelude {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        self.items.to_tokens(tokens)
    }
}

impl quote::ToTokens for Signature {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        self.items.to_tokens(tokens)
    }
}

/// Turns a test function into one returning `eyre::Result<()>`, so that `?`
/// can be used in its body, and runs the shared test setup first.
///
/// The body must end in a statement: `Ok(())` is appended after it.
#[proc_macro_attribute]
pub fn test(
    _attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let item = TokenStream::from(item);
    let mut tokens = item.to_token_iter();
    let TestFn {
        prelude,
        _fn,
        name,
        signature,
        body,
    } = match tokens.parse::<TestFn>() {
        Ok(test_fn) => test_fn,
        Err(_) => {
            return quote::quote! {
                ::core::compile_error!("#[stepmeta_testhelpers::test] expects a function");
            }
            .into();
        }
    };
    let body = body.0.stream();

    quote::quote! {
        #[::core::prelude::rust_2024::test]
        #prelude fn #name #signature -> ::stepmeta_testhelpers::eyre::Result<()> {
            ::stepmeta_testhelpers::setup();

            #body

            Ok(())
        }
    }
    .into()
}
