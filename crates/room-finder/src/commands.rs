use std::io::Write;
use std::path::Path;

use anyhow::Context;
use roomstore_core::{ContentEntry, MediaKind, RoomCatalog, RoomView};
use tracing::info;

use crate::config::Command;

async fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Content type for an upload: explicit, or guessed from the file extension.
pub fn upload_content_type(file: &Path, explicit: Option<&str>) -> anyhow::Result<String> {
    if let Some(content_type) = explicit {
        return Ok(content_type.to_string());
    }
    mime_guess::from_path(file)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .with_context(|| {
            format!(
                "Cannot tell the content type of {}; pass --content-type",
                file.display()
            )
        })
}

fn write_media(out: &mut impl Write, indent: &str, media: &[ContentEntry]) -> std::io::Result<()> {
    for entry in media {
        let kind = match MediaKind::from_name(&entry.name) {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        };
        match &entry.download_url {
            Some(url) => writeln!(out, "{}{}  ({}, {} bytes)  {}", indent, entry.name, kind, entry.size, url)?,
            None => writeln!(out, "{}{}  ({}, {} bytes)", indent, entry.name, kind, entry.size)?,
        }
    }
    Ok(())
}

fn write_room(out: &mut impl Write, view: &RoomView) -> std::io::Result<()> {
    writeln!(out, "{}", view.name)?;
    if view.info.trim().is_empty() {
        writeln!(out, "  No information available")?;
    } else {
        for line in view.info.lines() {
            writeln!(out, "  {}", line)?;
        }
    }

    writeln!(out, "\nMedia ({}):", view.media.len())?;
    write_media(out, "  ", &view.media)?;

    writeln!(out, "\nSubfolders ({}):", view.subfolders.len())?;
    for sub in &view.subfolders {
        let thumb = if sub.thumbnail.is_some() { "" } else { "  (no thumbnail.jpg)" };
        writeln!(out, "  {}{}", sub.name, thumb)?;
        for line in sub.info.lines() {
            writeln!(out, "    {}", line)?;
        }
        if sub.media.is_empty() {
            writeln!(out, "    No media available in {}", sub.name)?;
        }
        write_media(out, "    ", &sub.media)?;
    }
    Ok(())
}

/// Execute one command against the catalog, writing results to `out`.
pub async fn run(command: Command, catalog: &RoomCatalog, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Command::Rooms { search } => {
            let rooms = match search.as_deref() {
                Some(term) => catalog.search_rooms(term).await,
                None => catalog.list_rooms().await,
            };
            if rooms.is_empty() {
                writeln!(out, "No rooms found.")?;
            }
            for room in rooms {
                writeln!(out, "{}", room)?;
            }
        }
        Command::Show { room, json } => {
            let view = catalog.room_view(&room).await?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&view)?)?;
            } else {
                write_room(out, &view)?;
            }
        }
        Command::CreateRoom { room, .. } => {
            catalog.create_room(&room).await?;
            writeln!(out, "Room {} created", room)?;
        }
        Command::SetInfo {
            room,
            subfolder,
            text,
            file,
            ..
        } => {
            let text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(file)) => String::from_utf8_lossy(&read_file(&file).await?).into_owned(),
                (None, None) => anyhow::bail!("Pass --text or --file"),
            };
            catalog.update_info(&room, subfolder.as_deref(), &text).await?;
            writeln!(out, "Info updated")?;
        }
        Command::AddSubfolder {
            room,
            name,
            thumbnail,
            info,
            ..
        } => {
            let thumbnail = read_file(&thumbnail).await?;
            catalog.create_subfolder(&room, &name, &info, &thumbnail).await?;
            writeln!(out, "Subfolder {}/{} created", room, name)?;
        }
        Command::SetThumbnail {
            room,
            subfolder,
            image,
            ..
        } => {
            let image = read_file(&image).await?;
            catalog.replace_thumbnail(&room, &subfolder, &image).await?;
            writeln!(out, "Thumbnail updated")?;
        }
        Command::Upload {
            room,
            file,
            subfolder,
            content_type,
            ..
        } => {
            let content_type = upload_content_type(&file, content_type.as_deref())?;
            let data = read_file(&file).await?;
            let path = catalog
                .upload_media(&room, subfolder.as_deref(), &content_type, &data)
                .await?;
            info!("Uploaded {} as {}", file.display(), path);
            writeln!(out, "Uploaded {}", path)?;
        }
        Command::RenameFile {
            room,
            old_name,
            new_name,
            subfolder,
            ..
        } => {
            let path = catalog
                .rename_media(&room, subfolder.as_deref(), &old_name, &new_name)
                .await?;
            writeln!(out, "Renamed to {}", path)?;
        }
        Command::RenameRoom {
            old_name,
            new_name,
            ..
        } => {
            let moved = catalog.rename_room(&old_name, &new_name).await?;
            writeln!(out, "Room {} renamed to {} ({} files)", old_name, new_name, moved)?;
        }
        Command::RenameSubfolder {
            room,
            old_name,
            new_name,
            ..
        } => {
            let moved = catalog.rename_subfolder(&room, &old_name, &new_name).await?;
            writeln!(out, "Subfolder {} renamed to {} ({} files)", old_name, new_name, moved)?;
        }
        Command::DeleteFile {
            room,
            name,
            subfolder,
            ..
        } => {
            catalog.delete_media(&room, subfolder.as_deref(), &name).await?;
            writeln!(out, "Deleted {}", name)?;
        }
        Command::DeleteSubfolder { room, subfolder, .. } => {
            let deleted = catalog.delete_subfolder(&room, &subfolder).await?;
            writeln!(out, "Subfolder {}/{} deleted ({} files)", room, subfolder, deleted)?;
        }
        Command::DeleteRoom { room, .. } => {
            let deleted = catalog.delete_room(&room).await?;
            writeln!(out, "Room {} deleted ({} files)", room, deleted)?;
        }
    }
    Ok(())
}
