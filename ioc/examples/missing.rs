use fibre_ioc::{injectable, Injector};

fn main() {
  let injector = Injector::empty();
  let registrar = injector.registrar();

  registrar
    .factory("report", injectable!(["formatter" => _f: String] { 0_u32 }))
    .expect("factory registers");

  // Resolution errors are values, not panics.
  match injector.get::<u32>("report") {
    Ok(_) => unreachable!("formatter was never registered"),
    Err(e) => println!("Resolution failed as expected: {}", e),
  }

  registrar
    .factory("ping", injectable!(["pong" => _p: u32] { 1_u32 }))
    .expect("factory registers");
  registrar
    .factory("pong", injectable!(["ping" => _p: u32] { 2_u32 }))
    .expect("factory registers");

  if let Err(e) = injector.get::<u32>("ping") {
    println!("Cycle detected: {}", e);
  }
}
