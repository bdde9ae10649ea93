use super::args::{parse_int, parse_range, verify_length};
use super::{Registry, Result};
use crate::connection::Connection;
use crate::permission::Permission;
use crate::service::{Pairs, Service};
use crate::tags::TAG_MAPPING;

pub(super) fn register(registry: &mut Registry) {
    registry
        .command("status", status)
        .command("stats", stats)
        .command("currentsong", currentsong)
        .command("listallinfo", currentsong)
        .command("playlistinfo", playlistinfo)
        .command("playlistid", playlistid)
        .command("plchanges", plchanges)
        .command("plchangesposid", plchangesposid)
        .command("count", count)
        .command("outputs", outputs)
        .register("commands", commands, true, Permission::NONE)
        .command("tagtypes", tagtypes)
        .command("lsinfo", lsinfo)
        .command("list", nop)
        .command("listplaylists", nop);
}

fn write_pairs(conn: &Connection, pairs: Pairs) {
    for (key, value) in pairs {
        conn.write_line(&format!("{}: {}", key, value));
    }
}

fn write_lines(conn: &Connection, lines: Option<Vec<String>>) {
    for line in lines.into_iter().flatten() {
        conn.write_line(&line);
    }
}

fn status(conn: &mut Connection, service: &mut Service, _: &[String]) -> Result<()> {
    write_pairs(conn, service.status());
    Ok(())
}

fn stats(conn: &mut Connection, service: &mut Service, _: &[String]) -> Result<()> {
    write_pairs(conn, service.stats());
    Ok(())
}

fn currentsong(conn: &mut Connection, service: &mut Service, _: &[String]) -> Result<()> {
    write_lines(conn, service.currentsong());
    Ok(())
}

fn playlistinfo(conn: &mut Connection, service: &mut Service, args: &[String]) -> Result<()> {
    let range = match args.first() {
        Some(arg) => Some(parse_range(arg)?),
        None => None,
    };
    write_lines(conn, service.playlistinfo(range));
    Ok(())
}

fn playlistid(conn: &mut Connection, service: &mut Service, args: &[String]) -> Result<()> {
    let songid = match args.first() {
        Some(arg) => Some(parse_int(arg)?),
        None => None,
    };
    write_lines(conn, service.playlistid(songid));
    Ok(())
}

fn plchanges(conn: &mut Connection, service: &mut Service, args: &[String]) -> Result<()> {
    verify_length(args, 1)?;
    let version = parse_int(&args[0])?;
    write_lines(conn, service.plchanges(version));
    Ok(())
}

fn plchangesposid(conn: &mut Connection, service: &mut Service, args: &[String]) -> Result<()> {
    verify_length(args, 1)?;
    let version = parse_int(&args[0])?;
    write_lines(conn, service.plchangesposid(version));
    Ok(())
}

fn count(conn: &mut Connection, _: &mut Service, _: &[String]) -> Result<()> {
    conn.write_line("songs: 0");
    conn.write_line("playtime: 0");
    Ok(())
}

fn outputs(conn: &mut Connection, _: &mut Service, _: &[String]) -> Result<()> {
    conn.write_line("outputid: 0");
    conn.write_line("outputname: dummy");
    conn.write_line("outputenabled: 1");
    Ok(())
}

fn commands(conn: &mut Connection, _: &mut Service, _: &[String]) -> Result<()> {
    let names: Vec<&str> = conn.registry().names().collect();
    for name in names {
        conn.write_line(&format!("command: {}", name));
    }
    Ok(())
}

fn tagtypes(conn: &mut Connection, _: &mut Service, _: &[String]) -> Result<()> {
    for (name, _) in TAG_MAPPING {
        conn.write_line(&format!("tagtype: {}", name));
    }
    Ok(())
}

/// There is no browsable library; only the argument is checked.
fn lsinfo(_: &mut Connection, _: &mut Service, args: &[String]) -> Result<()> {
    verify_length(args, 1)
}

fn nop(_: &mut Connection, _: &mut Service, _: &[String]) -> Result<()> {
    Ok(())
}
