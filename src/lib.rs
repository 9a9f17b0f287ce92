/*!
# Storage App

A browser-based inventory-management client built in Rust, talking to a
remote REST inventory API.

## Overview

This project is a migration of an existing single-page storage client to
Rust. The app serves a set of thin table and sidebar views over inventory
entities (users, products, categories, transactions, logs) and pushes all
list derivation into pure, independently testable functions: generic stable
column sorting with direction toggling, and a collapsible category tree
derived from a flat parent-pointer collection.

## Architecture

The application follows a client-over-API architecture:

### View Layer
- **Technologies**: HTML, vanilla JS, embedded at compile time
- **Key Components**:
  - Table views - sortable lists per entity kind with per-column headers
  - Category sidebar - collapsible tree with per-node expand state
  - Modals and toasts - purchase/restock/create/update/delete glue
  - Navigation - session-aware nav bar with admin-only entries

### Core Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Sortable-Collection View - stable, non-mutating sort over opaque records
  - Parent-Pointer Tree Builder - forest index, cycle defense, expand state
  - Session Store - cookie-backed sessions with a derived admin flag
  - Route Guards - user and admin protection for pages and endpoints

### External Collaborators
- The remote inventory REST API owns all storage, validation and
  transactional behavior; this client fetches collections, derives views,
  and fires mutations at it one request at a time.

## Key Features

- Generic column sorting: click a header to activate it ascending, click it
  again to flip direction; missing fields sort as minimal instead of failing
- Hierarchical category sidebar resolved client-side from parent pointers,
  with defensive cycle detection instead of unbounded recursion
- Session management with admin gating derived from the user record
- Purchase/restock flows with an optimistic quantity patch in the view
- Transaction search by product or user name (admin)

## Modules

- **record**: opaque JSON records and generic field comparison
- **sorting**: sort state, header toggle protocol, stable sorting
- **category_tree**: children matching, tree index, expand state, name lookup
- **api**: client for the remote inventory REST API
- **session**: session store, auth session object, admin flag
- **config**: environment-driven runtime configuration
- **app**: routing, guards, page and JSON endpoint handlers
*/

pub mod api;
pub mod app;
pub mod category_tree;
pub mod config;
pub mod record;
pub mod session;
pub mod sorting;

pub use category_tree::{CategoryTree, ExpandState, children_of};
pub use record::Record;
pub use sorting::{SortState, sort_records};
