//! Public macros for ergonomic annotation.

/// Builds an [`Annotated`](crate::Annotated) whose dependencies are bound
/// to typed local names.
///
/// Each entry is `"token" => name: Type`; inside the body `name` is an
/// `Rc<Type>`. The body's value becomes the function's result. Resolution
/// and downcast failures propagate as [`InjectError`](crate::InjectError).
///
/// # Examples
///
/// ```
/// use fibre_ioc::{injectable, Injector};
///
/// let injector = Injector::empty();
/// let registrar = injector.registrar();
/// registrar.constant("greeting", String::from("Hello")).unwrap();
/// registrar
///   .factory(
///     "message",
///     injectable!(["greeting" => greeting: String] {
///       format!("{}, World!", greeting)
///     }),
///   )
///   .unwrap();
///
/// let message = injector.get::<String>("message").unwrap();
/// assert_eq!(*message, "Hello, World!");
/// ```
#[macro_export]
macro_rules! injectable {
    ([$($token:literal => $name:ident : $ty:ty),* $(,)?] $body:block) => {
        $crate::Annotated::new(&[$($token),*], move |_args: &$crate::Args<'_>| {
            $(let $name: ::std::rc::Rc<$ty> = _args.named::<$ty>($token)?;)*
            Ok($body)
        })
    };
}
