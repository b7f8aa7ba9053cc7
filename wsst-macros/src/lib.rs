use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{Ident, ItemFn, LitStr};

/// Proc macro to denote a Scenario
///
/// The function must be an `async fn` taking the connection and its checkpoints, and returning a
/// `ScenarioResult`. The macro replaces it with a function of the same name returning the
/// scenario.
///
/// Accepts an optional `description` and an optional `path` appended to the target URL.
///
/// # Example
/// ```ignore
/// use wsst::prelude::*;
///
/// #[scenario(description = "Join a room and leave", path = "/chat")]
/// async fn join_room(connection: &mut Connection, checkpoints: Checkpoints) -> ScenarioResult {
///     connection.send(r#"{"join": "lobby"}"#).await?;
///     connection.recv_text().await?;
///     checkpoints.checkpoint("Joined");
///     connection.close().await?;
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn scenario(attr: TokenStream, item: TokenStream) -> TokenStream {
    scenario_internal(attr, item, false).into()
}

/// Proc macro to denote a Scenario and register it with the wsst runtime.
///
/// Same as `scenario`, additionally making the scenario available by name to `WsstRuntime`.
#[proc_macro_attribute]
pub fn scenario_linkme(attr: TokenStream, item: TokenStream) -> TokenStream {
    scenario_internal(attr, item, true).into()
}

#[derive(Default)]
struct ScenarioArgs {
    description: Option<LitStr>,
    path: Option<LitStr>,
}

fn parse_args(attr: TokenStream) -> syn::Result<ScenarioArgs> {
    let mut args = ScenarioArgs::default();
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("description") {
            args.description = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("path") {
            args.path = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported scenario property, expected `description` or `path`"))
        }
    });
    syn::parse::Parser::parse(parser, attr)?;
    Ok(args)
}

fn scenario_internal(attr: TokenStream, item: TokenStream, linkme: bool) -> TokenStream2 {
    let args = match parse_args(attr) {
        Ok(args) => args,
        Err(err) => return err.to_compile_error(),
    };

    let input = match syn::parse::<ItemFn>(item) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    if input.sig.asyncness.is_none() {
        return syn::Error::new_spanned(&input.sig, "Scenarios must be `async fn`")
            .to_compile_error();
    }

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;

    let scen_name = sig.ident.clone();
    let inner_name = Ident::new(&format!("__wsst_{}", scen_name), Span::call_site());
    let mut inner_sig = sig.clone();
    inner_sig.ident = inner_name.clone();

    let description = args
        .description
        .unwrap_or_else(|| LitStr::new("", Span::call_site()));
    let path = args
        .path
        .unwrap_or_else(|| LitStr::new("", Span::call_site()));

    let res = quote! {
        #(#attrs)* #vis fn #scen_name() -> ::wsst::FnScenario {
            fn shim<'a>(
                connection: &'a mut ::wsst::Connection,
                checkpoints: ::wsst::Checkpoints,
            ) -> ::wsst::BoxFuture<'a, ::wsst::ScenarioResult> {
                ::std::boxed::Box::pin(#inner_name(connection, checkpoints))
            }

            ::wsst::FnScenario::new(stringify!(#scen_name), shim)
                .with_description(#description)
                .with_path(#path)
        }

        #[doc(hidden)]
        #vis #inner_sig #block
    };

    if !linkme {
        return res;
    }

    let factory_name = Ident::new(&format!("__wsst_factory_{}", scen_name), Span::call_site());
    let static_name = Ident::new(
        &format!("__WSST_SCENARIO_{}", scen_name.to_string().to_uppercase()),
        Span::call_site(),
    );

    quote! {
        #res

        #[doc(hidden)]
        fn #factory_name() -> ::std::sync::Arc<dyn ::wsst::Scenario> {
            ::std::sync::Arc::new(#scen_name())
        }

        #[::wsst::runtime::distributed_slice(::wsst::runtime::WSST_SCENARIOS)]
        #[linkme(crate = ::wsst::runtime::linkme)]
        #[doc(hidden)]
        static #static_name: (&'static str, fn() -> ::std::sync::Arc<dyn ::wsst::Scenario>) =
            (stringify!(#scen_name), #factory_name);
    }
}
