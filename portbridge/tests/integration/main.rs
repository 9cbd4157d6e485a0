// Integration tests follow the organization suggested by Matklad:
// https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod handler_failure;
mod instance_lifecycle;
mod port_delivery;
mod port_lookup;
