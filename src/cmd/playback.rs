use super::args::{parse_bool, parse_float, parse_int, verify_length};
use super::{Registry, Result};
use crate::connection::Connection;
use crate::service::Service;

pub(super) fn register(registry: &mut Registry) {
    registry
        .command("play", play)
        .command("playid", playid)
        .command("pause", pause)
        .command("stop", stop)
        .command("next", next)
        .command("previous", previous)
        .command("repeat", repeat)
        .command("random", random)
        .command("single", single)
        .command("setvol", setvol)
        .command("seek", seek)
        .command("seekid", seekid)
        .command("seekcur", seekcur);
}

fn play(_: &mut Connection, service: &mut Service, _: &[String]) -> Result<()> {
    service.play();
    Ok(())
}

fn playid(_: &mut Connection, service: &mut Service, args: &[String]) -> Result<()> {
    verify_length(args, 1)?;
    let songid = parse_int(&args[0])?;
    service.playid(songid);
    Ok(())
}

fn pause(_: &mut Connection, service: &mut Service, args: &[String]) -> Result<()> {
    let value = match args.first() {
        Some(arg) => Some(parse_bool(arg)?),
        None => None,
    };
    service.pause(value);
    Ok(())
}

fn stop(_: &mut Connection, service: &mut Service, _: &[String]) -> Result<()> {
    service.stop();
    Ok(())
}

fn next(_: &mut Connection, service: &mut Service, _: &[String]) -> Result<()> {
    service.next();
    Ok(())
}

fn previous(_: &mut Connection, service: &mut Service, _: &[String]) -> Result<()> {
    service.previous();
    Ok(())
}

fn repeat(_: &mut Connection, service: &mut Service, args: &[String]) -> Result<()> {
    verify_length(args, 1)?;
    service.repeat(parse_bool(&args[0])?);
    Ok(())
}

fn random(_: &mut Connection, service: &mut Service, args: &[String]) -> Result<()> {
    verify_length(args, 1)?;
    service.random(parse_bool(&args[0])?);
    Ok(())
}

fn single(_: &mut Connection, service: &mut Service, args: &[String]) -> Result<()> {
    verify_length(args, 1)?;
    service.single(parse_bool(&args[0])?);
    Ok(())
}

fn setvol(_: &mut Connection, service: &mut Service, args: &[String]) -> Result<()> {
    verify_length(args, 1)?;
    service.setvol(parse_int(&args[0])?);
    Ok(())
}

fn seek(_: &mut Connection, service: &mut Service, args: &[String]) -> Result<()> {
    verify_length(args, 2)?;
    let songpos = parse_int(&args[0])?;
    let seconds = parse_int(&args[1])?;
    service.seek(songpos, seconds);
    Ok(())
}

fn seekid(_: &mut Connection, service: &mut Service, args: &[String]) -> Result<()> {
    verify_length(args, 2)?;
    let songid = parse_int(&args[0])?;
    let seconds = parse_int(&args[1])?;
    service.seekid(songid, seconds);
    Ok(())
}

/// `+N` and `-N` seek relative to the current position.
fn seekcur(_: &mut Connection, service: &mut Service, args: &[String]) -> Result<()> {
    verify_length(args, 1)?;

    let arg = &args[0];
    let relative = arg.starts_with('+') || arg.starts_with('-');
    let value = parse_float(arg)?;

    service.seekcur(value, relative);
    Ok(())
}
