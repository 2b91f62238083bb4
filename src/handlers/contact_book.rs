// missivectl - CLI and connector for the Missive API
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use super::ResourceHandler;
use crate::client::RequestEnvelope;
use crate::error::Result;
use crate::params::Fields;
use crate::resource::{Operation, Resource};

pub struct ContactBookHandler;

impl ResourceHandler for ContactBookHandler {
    fn resource(&self) -> Resource {
        Resource::ContactBook
    }

    fn build(&self, operation: Operation, _fields: &Fields<'_>) -> Result<RequestEnvelope> {
        match operation {
            Operation::GetAll => Ok(RequestEnvelope::get("/contact_books")),
            other => Err(self.unsupported(other)),
        }
    }
}
