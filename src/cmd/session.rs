use super::args::verify_length;
use super::{Registry, Result};
use crate::connection::Connection;
use crate::permission::Permission;
use crate::service::Service;

pub(super) fn register(registry: &mut Registry) {
    registry
        .register("idle", idle, false, Permission::ADMIN)
        .register("ping", ping, true, Permission::NONE)
        .register("password", password, true, Permission::NONE)
        .command("noidle", noidle)
        .register("close", close, false, Permission::NONE);
}

/// Answered later, by the service, once something changed.
fn idle(conn: &mut Connection, service: &mut Service, args: &[String]) -> Result<()> {
    service.register_idle(conn.id(), args);
    Ok(())
}

fn ping(_: &mut Connection, _: &mut Service, _: &[String]) -> Result<()> {
    Ok(())
}

fn password(conn: &mut Connection, service: &mut Service, args: &[String]) -> Result<()> {
    verify_length(args, 1)?;
    conn.authenticate(service, &args[0])
}

fn noidle(conn: &mut Connection, service: &mut Service, _: &[String]) -> Result<()> {
    service.unregister_idle(conn.id());
    Ok(())
}

fn close(conn: &mut Connection, service: &mut Service, _: &[String]) -> Result<()> {
    conn.close(service);
    Ok(())
}
