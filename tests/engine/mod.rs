// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Engine Tests Module
 * Shared fixtures plus the orchestrator flow, property and scenario suites
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

mod fixtures;
mod properties;
mod scan_flow;
mod scenarios;
